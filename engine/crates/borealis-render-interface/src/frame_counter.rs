use std::{fmt::Display, ops::Deref};

/// 帧标签
///
/// 表示当前处于 Frames in Flight 的哪一个 slot，
/// 打印为 A/B/C/...，通过 `Deref` 转换为 slot 下标。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLabel {
    index: usize,
}
impl FrameLabel {
    #[inline]
    pub fn from_usize(index: usize) -> Self {
        Self { index }
    }
}
impl Deref for FrameLabel {
    type Target = usize;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.index
    }
}
impl Display for FrameLabel {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // slot 数量很小，字母表足够
        write!(f, "{}", (b'A' + (self.index % 26) as u8) as char)
    }
}

/// 帧计数器
///
/// frame_id 一直向上累加；slot 下标 = frame_id % fif_count。
pub struct FrameCounter {
    /// 当前的帧序号，一直累加
    frame_id: u64,
    fif_count: usize,
}
// new & init
impl FrameCounter {
    pub fn new(fif_count: usize) -> Self {
        assert!(fif_count >= 1, "frames in flight must be at least 1");
        Self {
            frame_id: 0,
            fif_count,
        }
    }
}
// update
impl FrameCounter {
    #[inline]
    pub fn next_frame(&mut self) {
        self.frame_id = self.frame_id.wrapping_add(1);
    }
}
// getters
impl FrameCounter {
    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    #[inline]
    pub fn fif_count(&self) -> usize {
        self.fif_count
    }

    #[inline]
    pub fn frame_label(&self) -> FrameLabel {
        FrameLabel::from_usize(self.frame_id as usize % self.fif_count)
    }

    /// 用于 debug name 的帧名，例如 `[F7B]`
    #[inline]
    pub fn frame_name(&self) -> String {
        format!("[F{}{}]", self.frame_id, self.frame_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_rotation_mod_n() {
        let mut counter = FrameCounter::new(3);
        let mut seen = vec![];
        for _ in 0..7 {
            seen.push(*counter.frame_label());
            counter.next_frame();
        }
        assert_eq!(seen, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_same_slot_returns_after_n_frames() {
        let mut counter = FrameCounter::new(2);
        let first = *counter.frame_label();
        counter.next_frame();
        assert_ne!(*counter.frame_label(), first);
        counter.next_frame();
        assert_eq!(*counter.frame_label(), first);
    }

    #[test]
    fn test_frame_label_display() {
        assert_eq!(FrameLabel::from_usize(0).to_string(), "A");
        assert_eq!(FrameLabel::from_usize(2).to_string(), "C");
    }
}
