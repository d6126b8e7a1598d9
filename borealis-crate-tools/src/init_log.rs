use std::io::Write;

/// 初始化全局 logger
///
/// 格式：`[时:分:秒 LEVEL 文件:行号] 消息`，默认等级 Info，
/// 可以通过 `RUST_LOG` 环境变量覆盖。
pub fn init_log() {
    env_logger::Builder::new()
        .format(|buf, record| {
            let level_style = match record.level() {
                log::Level::Error => buf
                    .default_level_style(log::Level::Error)
                    .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
                log::Level::Warn => buf
                    .default_level_style(log::Level::Warn)
                    .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
                log::Level::Info => buf
                    .default_level_style(log::Level::Info)
                    .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
                _ => buf
                    .default_level_style(record.level())
                    .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Cyan))),
            };
            let dim_style = level_style.fg_color(Some(anstyle::Color::Rgb(anstyle::RgbColor(120, 120, 120))));

            let time = chrono::Local::now().format("%H:%M:%S");
            let level = record.level();
            let file = record.file().unwrap_or("").rsplit(['/', '\\']).next().unwrap_or("");
            let line = record.line().unwrap_or(0);

            writeln!(
                buf,
                "{level_style}[{time} {level}]{level_style:#} {dim_style}{file}:{line}{dim_style:#} {}",
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
