//! Primary half: faces the host and merges both halves' input.

use super::{Backoff, LocalInput, Tick};
use crate::config::{
    COLS, LINK_MESSAGE_SIZE, MAX_KEY_EVENTS, PEER_CONNECTION_INTERVAL_MS, THUMB_STICK_SPEED,
};
use crate::debounce::Debouncer;
use crate::dispatch::{ActionSender, KeyId, KeySource};
use crate::hid::{Keyboard, Media, Mouse};
use crate::input::{EncoderSource, KeyEventSource, StickSource};
use crate::keymap::{Keymap, LogicalAction};
use crate::link::{
    CentralLink, Frame, HostLink, LinkMessage, MessageKind, PeerConnection, SequenceTracker,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostState {
    Idle,
    Advertising,
    Connected,
}

/// Outbound link toward the secondary half.
pub enum PeerState<C> {
    Scanning(Backoff),
    Connected(C),
}

enum PeerPoll {
    Idle,
    Lost,
    Attempt,
}

pub struct Primary<KS, E, ST, H, C: CentralLink, K, M, D> {
    input: LocalInput<KS, E, ST>,
    encoder: Debouncer<i32>,
    host: H,
    host_state: HostState,
    central: C,
    peer: PeerState<C::Connection>,
    tracker: SequenceTracker,
    keymap: Keymap,
    sender: ActionSender<K, M, D>,
    stick_speed: f32,
}

impl<KS, E, ST, H, C, K, M, D> Primary<KS, E, ST, H, C, K, M, D>
where
    KS: KeyEventSource,
    E: EncoderSource,
    ST: StickSource,
    H: HostLink,
    C: CentralLink,
    K: Keyboard,
    M: Mouse,
    D: Media,
{
    pub fn new(
        mut input: LocalInput<KS, E, ST>,
        host: H,
        central: C,
        keymap: Keymap,
        sender: ActionSender<K, M, D>,
    ) -> Self {
        let encoder = Debouncer::new(input.encoder.position());
        Self {
            input,
            encoder,
            host,
            host_state: HostState::Idle,
            central,
            peer: PeerState::Scanning(Backoff::new()),
            tracker: SequenceTracker::new(),
            keymap,
            sender,
            stick_speed: THUMB_STICK_SPEED,
        }
    }

    /// Start with a known last sequence, as if that frame had been read.
    pub fn with_tracker(mut self, tracker: SequenceTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_stick_speed(mut self, speed: f32) -> Self {
        self.stick_speed = speed;
        self
    }

    pub fn host_state(&self) -> HostState {
        self.host_state
    }

    pub fn peer_connected(&self) -> bool {
        matches!(self.peer, PeerState::Connected(_))
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn sender(&self) -> &ActionSender<K, M, D> {
        &self.sender
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn central_mut(&mut self) -> &mut C {
        &mut self.central
    }

    fn update_host(&mut self) {
        let connected = self.host.is_connected();
        match (self.host_state, connected) {
            (HostState::Connected, true) => {}
            (HostState::Connected, false) => {
                info!("host disconnected, advertising");
                self.sender.release_held(&mut self.keymap, KeySource::Primary);
                self.sender.release_held(&mut self.keymap, KeySource::Secondary);
                self.sender.release_all();
                self.host.start_advertising();
                self.host_state = HostState::Advertising;
            }
            (_, true) => {
                info!("host connected");
                self.host.stop_advertising();
                self.host_state = HostState::Connected;
            }
            (HostState::Idle, false) => {
                info!("advertising to host");
                self.host.start_advertising();
                self.host_state = HostState::Advertising;
            }
            (HostState::Advertising, false) => {}
        }
    }

    fn process_keys(&mut self, dispatch: bool) {
        for _ in 0..MAX_KEY_EVENTS {
            let Some(event) = self.input.keys.poll() else {
                break;
            };
            if !dispatch {
                continue;
            }
            let key = KeyId::from_key_number(KeySource::Primary, event.key_number, COLS);
            if event.pressed {
                self.sender.press_key(&mut self.keymap, key);
            } else {
                self.sender.release_key(&mut self.keymap, key);
            }
        }
    }

    fn process_encoder(&mut self, dispatch: bool) {
        self.encoder.update(self.input.encoder.position());
        if !dispatch || !self.encoder.changed() {
            return;
        }
        let encoder = self.keymap.active_layer().primary_encoder();
        let action = if self.encoder.rose() {
            encoder.clockwise.clone()
        } else {
            encoder.counter_clockwise.clone()
        };
        self.fire(&action, self.encoder.diff().unsigned_abs());
    }

    fn fire(&mut self, action: &LogicalAction, times: u32) {
        for _ in 0..times {
            self.sender.press_and_release(&mut self.keymap, action);
        }
    }

    fn process_stick(&mut self) {
        let (x, y) = self.input.stick.read();
        move_pointer(&mut self.sender, x, y, self.stick_speed);
    }

    fn poll_peer(&mut self, dispatch: bool) {
        let mut frame: Frame = [0; LINK_MESSAGE_SIZE];
        let poll = match &mut self.peer {
            PeerState::Connected(conn) if !conn.is_connected() => PeerPoll::Lost,
            PeerState::Connected(conn) => {
                for _ in 0..MAX_KEY_EVENTS {
                    let read = conn.try_receive_into(&mut frame);
                    if read == 0 {
                        break;
                    }
                    if read != LINK_MESSAGE_SIZE {
                        warn!("short frame ({} bytes)", read);
                        break;
                    }
                    if !self.tracker.accept(frame[0]) {
                        break;
                    }
                    if dispatch {
                        handle_frame(&frame, &mut self.keymap, &mut self.sender, self.stick_speed);
                    }
                }
                PeerPoll::Idle
            }
            PeerState::Scanning(backoff) => {
                if backoff.ready() {
                    PeerPoll::Attempt
                } else {
                    PeerPoll::Idle
                }
            }
        };

        match poll {
            PeerPoll::Idle => {}
            PeerPoll::Lost => {
                warn!("peer lost, releasing keys and scanning");
                self.sender.release_held(&mut self.keymap, KeySource::Secondary);
                self.sender.release_all();
                self.peer = PeerState::Scanning(Backoff::new());
            }
            PeerPoll::Attempt => self.connect_peer(),
        }
    }

    fn connect_peer(&mut self) {
        debug!("scanning for peer");
        let result = match self.central.scan_for_peer() {
            Some(peer) => self
                .central
                .connect(peer, PEER_CONNECTION_INTERVAL_MS)
                .map(Some),
            None => Ok(None),
        };
        match result {
            Ok(Some(conn)) => {
                info!("peer connected");
                self.tracker.reset();
                self.peer = PeerState::Connected(conn);
            }
            Ok(None) => self.retry_later(),
            Err(e) => {
                warn!("peer connect failed: {:?}", e);
                self.retry_later();
            }
        }
    }

    fn retry_later(&mut self) {
        if let PeerState::Scanning(backoff) = &mut self.peer {
            backoff.failed();
            debug!("next peer attempt in {} ticks", backoff.remaining());
        }
    }
}

/// Act on one new frame from the secondary half.
fn handle_frame<K: Keyboard, M: Mouse, D: Media>(
    frame: &Frame,
    keymap: &mut Keymap,
    sender: &mut ActionSender<K, M, D>,
    stick_speed: f32,
) {
    let message = match LinkMessage::decode(frame) {
        Ok(message) => message,
        Err(_) => {
            warn!("dropping frame with kind {}", frame[1]);
            return;
        }
    };
    trace!("frame {:?}", message);
    match message.kind {
        MessageKind::Key => {
            let (key_number, pressed) = message.key_event();
            let key = KeyId::from_key_number(KeySource::Secondary, key_number as u16, COLS);
            if pressed {
                sender.press_key(keymap, key);
            } else {
                sender.release_key(keymap, key);
            }
        }
        MessageKind::Encoder => {
            let encoder = keymap.active_layer().secondary_encoder().clone();
            for _ in 0..message.payload_1 {
                sender.press_and_release(keymap, &encoder.clockwise);
            }
            for _ in 0..message.payload_2 {
                sender.press_and_release(keymap, &encoder.counter_clockwise);
            }
        }
        MessageKind::ThumbStick => {
            let (x, y) = message.stick_position();
            move_pointer(sender, x, y, stick_speed);
        }
    }
}

/// Scale a normalized stick position into a relative pointer move.
fn move_pointer<K: Keyboard, M: Mouse, D: Media>(
    sender: &mut ActionSender<K, M, D>,
    x: f32,
    y: f32,
    speed: f32,
) {
    let dx = (x * speed) as i32;
    let dy = (y * speed) as i32;
    if dx != 0 || dy != 0 {
        sender.hid_mut().mouse.move_by(dx, dy, 0);
    }
}

impl<KS, E, ST, H, C, K, M, D> Tick for Primary<KS, E, ST, H, C, K, M, D>
where
    KS: KeyEventSource,
    E: EncoderSource,
    ST: StickSource,
    H: HostLink,
    C: CentralLink,
    K: Keyboard,
    M: Mouse,
    D: Media,
{
    /// Local input first, then the peer link. Input is only dispatched
    /// while a host is connected; otherwise it is consumed and dropped.
    fn tick(&mut self) {
        self.update_host();
        let dispatch = self.host_state == HostState::Connected;
        self.process_keys(dispatch);
        self.process_encoder(dispatch);
        if dispatch {
            self.process_stick();
        }
        self.poll_peer(dispatch);
    }
}
