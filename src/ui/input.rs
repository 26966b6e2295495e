/// Keyboard edge detector.
///
/// Each key runs its own small state machine:
///
/// ```text
///            Press                 Release / hold timeout
///   Idle ───────────────▶ Pressed ───────────────────────▶ Idle
///                          │   ▲
///                          └───┘ Repeat (or autorepeat Press)
/// ```
///
/// Only the Idle → Pressed transition produces a fresh press, so a held
/// key yields exactly one move. Keys are independent: holding Left does
/// not swallow a press of Up.
///
/// Autorepeat may arrive as Repeat or as plain Press events; both only
/// refresh a Pressed key. Where Release is reported (keyboard enhancement,
/// or natively on Windows) it is the only way back to Idle. Elsewhere a
/// key falls back to Idle once it has not been reported for
/// `hold_timeout`, which must outlast the OS autorepeat delay. The cost:
/// on such terminals two taps of the same key closer together than
/// `hold_timeout` count as one press.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum KeyPhase {
    Idle,
    Pressed { last_seen: Instant },
}

/// Whether key Release events can be trusted on this terminal.
///
/// crossterm reports Release natively on Windows; elsewhere only with
/// keyboard enhancement active.
pub fn releases_reported(enhanced_keys: bool) -> bool {
    enhanced_keys || cfg!(windows)
}

pub struct InputState {
    keys: HashMap<KeyCode, KeyPhase>,

    /// Keys that went Idle → Pressed since the last `begin_frame()`,
    /// in arrival order.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    raw_events: Vec<KeyEvent>,

    /// Whether the terminal reports Release/Repeat. Only true when
    /// keyboard enhancement is confirmed working.
    pub honor_release: bool,

    hold_timeout: Duration,
}

impl InputState {
    pub fn new(hold_timeout: Duration) -> Self {
        InputState {
            keys: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
            hold_timeout,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before the simulation.
    pub fn drain_events(&mut self) -> std::io::Result<()> {
        self.begin_frame();

        // Read all available events without blocking
        while poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                self.feed(key, Instant::now());
            }
        }

        self.expire(Instant::now());
        Ok(())
    }

    /// Forget last frame's edges.
    pub fn begin_frame(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
    }

    /// Advance one key's state machine.
    pub fn feed(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);

        let phase = self.keys.get(&key.code).copied().unwrap_or(KeyPhase::Idle);
        let next = match (key.kind, phase) {
            (KeyEventKind::Release, _) if self.honor_release => KeyPhase::Idle,
            // Release not trusted: rely on timeout-based expiry instead
            (KeyEventKind::Release, p) => p,
            // Repeat, or autorepeat disguised as Press
            (_, KeyPhase::Pressed { .. }) => KeyPhase::Pressed { last_seen: now },
            (_, KeyPhase::Idle) => {
                self.fresh_presses.push(key.code);
                KeyPhase::Pressed { last_seen: now }
            }
        };

        match next {
            KeyPhase::Idle => { self.keys.remove(&key.code); }
            pressed => { self.keys.insert(key.code, pressed); }
        }
    }

    /// Return stale keys to Idle (fallback for terminals without Release).
    pub fn expire(&mut self, now: Instant) {
        if self.honor_release { return; }
        let timeout = self.hold_timeout;
        self.keys.retain(|_, phase| match phase {
            KeyPhase::Pressed { last_seen } => now.duration_since(*last_seen) < timeout,
            KeyPhase::Idle => false,
        });
    }

    /// Fresh presses of this frame, oldest first.
    pub fn fresh_presses(&self) -> &[KeyCode] {
        &self.fresh_presses
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    /// Convenience: was any of these keys freshly pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Is this key currently held down?
    #[allow(dead_code)]
    pub fn is_held(&self, code: KeyCode) -> bool {
        matches!(self.keys.get(&code), Some(KeyPhase::Pressed { .. }))
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(700);
    const REPEAT: Duration = Duration::from_millis(33);

    fn ev(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    fn press(code: KeyCode) -> KeyEvent { ev(code, KeyEventKind::Press) }
    fn repeat(code: KeyCode) -> KeyEvent { ev(code, KeyEventKind::Repeat) }
    fn release(code: KeyCode) -> KeyEvent { ev(code, KeyEventKind::Release) }

    fn enhanced() -> InputState {
        let mut kb = InputState::new(TIMEOUT);
        kb.honor_release = true;
        kb
    }

    // ── Enhanced terminals (Release reported) ──

    #[test]
    fn held_key_yields_one_press() {
        let mut kb = enhanced();
        let t0 = Instant::now();
        kb.begin_frame();
        kb.feed(press(KeyCode::Right), t0);
        assert_eq!(kb.fresh_presses(), &[KeyCode::Right]);

        for i in 1..10 {
            kb.begin_frame();
            kb.feed(repeat(KeyCode::Right), t0 + Duration::from_millis(40 * i));
            assert!(kb.fresh_presses().is_empty());
            assert!(kb.is_held(KeyCode::Right));
        }
    }

    #[test]
    fn release_rearms_key() {
        let mut kb = enhanced();
        let t0 = Instant::now();
        kb.begin_frame();
        kb.feed(press(KeyCode::Up), t0);
        kb.feed(release(KeyCode::Up), t0);
        assert!(!kb.is_held(KeyCode::Up));

        kb.begin_frame();
        kb.feed(press(KeyCode::Up), t0 + Duration::from_millis(10));
        assert_eq!(kb.fresh_presses(), &[KeyCode::Up]);
    }

    #[test]
    fn two_taps_in_one_frame_both_count() {
        let mut kb = enhanced();
        let t0 = Instant::now();
        kb.begin_frame();
        kb.feed(press(KeyCode::Down), t0);
        kb.feed(release(KeyCode::Down), t0);
        kb.feed(press(KeyCode::Down), t0);
        assert_eq!(kb.fresh_presses(), &[KeyCode::Down, KeyCode::Down]);
    }

    #[test]
    fn keys_are_independent() {
        let mut kb = enhanced();
        let t0 = Instant::now();
        kb.begin_frame();
        kb.feed(press(KeyCode::Left), t0);
        kb.feed(press(KeyCode::Up), t0);
        assert_eq!(kb.fresh_presses(), &[KeyCode::Left, KeyCode::Up]);

        // Releasing one leaves the other held
        kb.begin_frame();
        kb.feed(release(KeyCode::Left), t0);
        kb.feed(repeat(KeyCode::Up), t0);
        assert!(kb.fresh_presses().is_empty());
        assert!(kb.is_held(KeyCode::Up));
        assert!(!kb.is_held(KeyCode::Left));
    }

    #[test]
    fn enhanced_does_not_expire_held_key() {
        let mut kb = enhanced();
        let t0 = Instant::now();
        kb.feed(press(KeyCode::Left), t0);
        kb.expire(t0 + Duration::from_secs(5));
        assert!(kb.is_held(KeyCode::Left));
    }

    #[test]
    fn autorepeat_as_press_yields_one_press() {
        // Text keys may repeat as plain Press even with enhancement on
        let mut kb = enhanced();
        let t0 = Instant::now();
        let mut total = 0;
        for i in 0..10 {
            kb.begin_frame();
            kb.feed(press(KeyCode::Char('d')), t0 + REPEAT * i);
            total += kb.fresh_presses().len();
        }
        assert_eq!(total, 1);

        kb.feed(release(KeyCode::Char('d')), t0 + REPEAT * 10);
        kb.begin_frame();
        kb.feed(press(KeyCode::Char('d')), t0 + REPEAT * 11);
        assert_eq!(kb.fresh_presses(), &[KeyCode::Char('d')]);
    }

    #[test]
    fn release_trust_follows_platform() {
        assert!(releases_reported(true));
        assert_eq!(releases_reported(false), cfg!(windows));
    }

    // ── Fallback terminals (no Release) ──

    #[test]
    fn fallback_autorepeat_suppressed() {
        let mut kb = InputState::new(TIMEOUT);
        let t0 = Instant::now();
        kb.begin_frame();
        kb.feed(press(KeyCode::Right), t0);
        assert_eq!(kb.fresh_presses().len(), 1);

        // Autorepeat arrives as Press every 40ms
        for i in 1..10 {
            let t = t0 + Duration::from_millis(40 * i);
            kb.begin_frame();
            kb.feed(press(KeyCode::Right), t);
            kb.expire(t);
            assert!(kb.fresh_presses().is_empty());
        }
    }

    #[test]
    fn fallback_hold_through_autorepeat_delay_yields_one_press() {
        let mut kb = InputState::new(TIMEOUT);
        let t0 = Instant::now();
        let mut total = 0;

        kb.begin_frame();
        kb.feed(press(KeyCode::Right), t0);
        total += kb.fresh_presses().len();

        // Quiet until the OS starts repeating at 500ms, one frame per 16ms
        let mut t = t0;
        while t < t0 + Duration::from_millis(500) {
            t += Duration::from_millis(16);
            kb.begin_frame();
            kb.expire(t);
            total += kb.fresh_presses().len();
        }
        for _ in 0..20 {
            t += REPEAT;
            kb.begin_frame();
            kb.feed(press(KeyCode::Right), t);
            kb.expire(t);
            total += kb.fresh_presses().len();
        }
        assert_eq!(total, 1);
    }

    #[test]
    fn fallback_quick_retap_merges() {
        let mut kb = InputState::new(TIMEOUT);
        let t0 = Instant::now();
        kb.feed(press(KeyCode::Up), t0);
        kb.begin_frame();
        kb.expire(t0 + Duration::from_millis(200));
        kb.feed(press(KeyCode::Up), t0 + Duration::from_millis(200));
        assert!(kb.fresh_presses().is_empty());
    }

    #[test]
    fn fallback_release_ignored_until_timeout() {
        let mut kb = InputState::new(TIMEOUT);
        let t0 = Instant::now();
        kb.feed(press(KeyCode::Up), t0);
        kb.feed(release(KeyCode::Up), t0);
        assert!(kb.is_held(KeyCode::Up));

        kb.expire(t0 + TIMEOUT);
        assert!(!kb.is_held(KeyCode::Up));

        kb.begin_frame();
        kb.feed(press(KeyCode::Up), t0 + TIMEOUT);
        assert_eq!(kb.fresh_presses(), &[KeyCode::Up]);
    }

    #[test]
    fn ctrl_c_detected() {
        let mut kb = InputState::new(TIMEOUT);
        kb.feed(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), Instant::now());
        assert!(kb.ctrl_c_pressed());
        kb.begin_frame();
        assert!(!kb.ctrl_c_pressed());
    }
}
