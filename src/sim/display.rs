/// Key code `wait_key` reports. Scripts treat it as "no key pressed".
pub const NO_KEY: i64 = 0;

/// Display sink that renders nothing and never blocks.
///
/// Control scripts written against a desktop image viewer call `show_frame`
/// and `wait_key` in their loop; both return immediately here.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    frames_shown: u64,
}

impl HeadlessDisplay {
    pub fn show_frame(&mut self, window: &str) {
        self.frames_shown += 1;
        tracing::trace!(window, frames_shown = self.frames_shown, "frame dropped");
    }

    pub fn wait_key(&mut self, _delay_ms: i64) -> i64 {
        NO_KEY
    }
}
