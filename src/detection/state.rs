// src/detection/state.rs
use serde::Serialize;

/// Poll-to-poll memory of the detection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DetectionState {
    pub ad_playing: bool,
    pub overlay_visible: bool,
    pub user_dismissed: bool,
}

/// What a poll result asks the overlay to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Show,
    Hide,
}

impl DetectionState {
    /// Fold one detector result into the state. The dismiss flag is cleared
    /// on every ad edge so it never outlives the ad it was set for.
    pub fn observe(&mut self, is_ad: bool) -> Transition {
        match (self.ad_playing, is_ad) {
            (false, true) => {
                self.ad_playing = true;
                self.user_dismissed = false;
                Transition::Show
            }
            (true, false) => {
                self.ad_playing = false;
                self.user_dismissed = false;
                Transition::Hide
            }
            // Ongoing ad (shown, pending, or dismissed) or ongoing content.
            _ => Transition::None,
        }
    }

    /// User closed the overlay. Only meaningful during an ad.
    pub fn dismiss(&mut self) -> bool {
        if !self.ad_playing {
            return false;
        }
        self.user_dismissed = true;
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_drive_show_and_hide() {
        let mut s = DetectionState::default();
        let seq = [false, true, true, true, false];
        let out: Vec<_> = seq.iter().map(|&ad| s.observe(ad)).collect();
        assert_eq!(
            out,
            vec![
                Transition::None,
                Transition::Show,
                Transition::None,
                Transition::None,
                Transition::Hide
            ]
        );
    }

    #[test]
    fn dismiss_survives_the_ad_but_not_the_next_one() {
        let mut s = DetectionState::default();
        s.observe(true);
        assert!(s.dismiss());
        assert_eq!(s.observe(true), Transition::None);
        assert!(s.user_dismissed);

        assert_eq!(s.observe(false), Transition::Hide);
        assert!(!s.user_dismissed);
        assert_eq!(s.observe(true), Transition::Show);
        assert!(!s.user_dismissed);
    }

    #[test]
    fn dismiss_outside_ad_is_ignored() {
        let mut s = DetectionState::default();
        assert!(!s.dismiss());
        assert!(!s.user_dismissed);
    }
}
