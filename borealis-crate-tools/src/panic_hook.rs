/// 把 panic 信息交给 logger，再走默认的 hook
///
/// GPU 对象创建失败等致命错误都以 panic 的形式出现，
/// 这样至少能在日志里留下带时间戳的记录。
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("{}", info);
        default_hook(info);
    }));
}
