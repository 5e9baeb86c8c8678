//! Secondary half: scans its own input and reports changes to the primary.

use super::{LocalInput, Tick};
use crate::codec::encode_float;
use crate::config::MAX_KEY_EVENTS;
use crate::debounce::Debouncer;
use crate::input::{EncoderSource, KeyEventSource, StickSource};
use crate::link::{LinkMessage, PeerLink, SequenceCounter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    Idle,
    Advertising,
    Connected,
}

pub struct Secondary<KS, E, ST, P> {
    input: LocalInput<KS, E, ST>,
    encoder: Debouncer<i32>,
    link: P,
    state: LinkState,
    counter: SequenceCounter,
    stick_active: bool,
}

impl<KS, E, ST, P> Secondary<KS, E, ST, P>
where
    KS: KeyEventSource,
    E: EncoderSource,
    ST: StickSource,
    P: PeerLink,
{
    pub fn new(mut input: LocalInput<KS, E, ST>, link: P) -> Self {
        let encoder = Debouncer::new(input.encoder.position());
        Self {
            input,
            encoder,
            link,
            state: LinkState::Idle,
            counter: SequenceCounter::default(),
            stick_active: false,
        }
    }

    pub fn with_counter(mut self, counter: SequenceCounter) -> Self {
        self.counter = counter;
        self
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn counter(&self) -> &SequenceCounter {
        &self.counter
    }

    pub fn link(&self) -> &P {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut P {
        &mut self.link
    }

    fn update_link(&mut self) {
        let connected = self.link.is_connected();
        match (self.state, connected) {
            (LinkState::Connected, true) | (LinkState::Advertising, false) => {}
            (LinkState::Connected, false) => {
                info!("primary lost, advertising");
                self.stick_active = false;
                self.link.start_advertising();
                self.state = LinkState::Advertising;
            }
            (_, true) => {
                info!("primary connected");
                self.state = LinkState::Connected;
            }
            (LinkState::Idle, false) => {
                info!("advertising to primary");
                self.link.stop_advertising();
                self.link.start_advertising();
                self.state = LinkState::Advertising;
            }
        }
    }

    /// Tag with the next sequence number and publish.
    fn send(&mut self, build: impl FnOnce(u8) -> LinkMessage) {
        let message = build(self.counter.increment());
        trace!("send {:?}", message);
        if let Err(e) = self.link.send(&message.encode()) {
            debug!("frame lost: {:?}", e);
        }
    }

    fn report_encoder(&mut self) {
        self.encoder.update(self.input.encoder.position());
        if self.state != LinkState::Connected || !self.encoder.changed() {
            return;
        }
        let bumps = u8::try_from(self.encoder.diff().unsigned_abs()).unwrap_or(u8::MAX);
        if self.encoder.rose() {
            self.send(|seq| LinkMessage::encoder(seq, bumps, 0));
        } else {
            self.send(|seq| LinkMessage::encoder(seq, 0, bumps));
        }
    }

    fn report_keys(&mut self) {
        for _ in 0..MAX_KEY_EVENTS {
            let Some(event) = self.input.keys.poll() else {
                break;
            };
            match u8::try_from(event.key_number) {
                Ok(key) => self.send(|seq| LinkMessage::key(seq, key, event.pressed)),
                Err(_) => warn!("key {} does not fit a frame", event.key_number),
            }
        }
    }

    /// Non-centered positions are sent every tick; the return to center
    /// is sent once.
    fn report_stick(&mut self) {
        let (x, y) = self.input.stick.read();
        let centered = encode_float(x) == 0 && encode_float(y) == 0;
        if !centered {
            self.stick_active = true;
            self.send(|seq| LinkMessage::thumb_stick(seq, x, y));
        } else if self.stick_active {
            self.stick_active = false;
            self.send(LinkMessage::thumb_stick_centered);
        }
    }
}

impl<KS, E, ST, P> Tick for Secondary<KS, E, ST, P>
where
    KS: KeyEventSource,
    E: EncoderSource,
    ST: StickSource,
    P: PeerLink,
{
    /// Key events are left queued while no primary is connected.
    fn tick(&mut self) {
        self.update_link();
        self.report_encoder();
        if self.state != LinkState::Connected {
            return;
        }
        self.report_keys();
        self.report_stick();
    }
}
