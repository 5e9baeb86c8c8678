//! The split link over BLE.
//!
//! Secondary: a GATT server with one 4-byte read/notify characteristic.
//! [`peripheral_task`] advertises when the role loop asks for it and
//! serves the connection; [`BlePeerLink`] notifies frames on it.
//!
//! Primary: [`central_task`] scans for the Roki service on request,
//! connects, subscribes and queues every notified frame in [`FRAMES`].
//! [`BleCentral`] and [`BlePeerConnection`] expose that to the role loop
//! without blocking.

use core::cell::RefCell;

use defmt::{debug, info, warn};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use nrf_softdevice::ble::advertisement_builder::{
    Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
};
use nrf_softdevice::ble::gatt_server::set_sys_attrs;
use nrf_softdevice::ble::{central, gatt_client, gatt_server, peripheral, Address, Connection};
use nrf_softdevice::{raw, Softdevice};
use roki::config::{BLE_DEVICE_NAME, BLE_SUP_TIMEOUT, LINK_MESSAGE_SIZE, PEER_CONNECTION_INTERVAL_MS};
use roki::link::adv::{contains_service_uuid128, device_name, ROKI_SERVICE_UUID128};
use roki::link::{connection_interval_units, CentralLink, Frame, PeerConnection, PeerLink};
use roki::LinkError;

/// Frames notified by the secondary, oldest first.
const FRAME_QUEUE_DEPTH: usize = 8;

/// How long one scan for the secondary runs before giving up.
const SCAN_WINDOW: Duration = Duration::from_secs(1);

/// Pause before advertising again after the SoftDevice refused.
const ADVERTISE_RETRY: Duration = Duration::from_millis(100);

// The macros need literals; these match `ROKI_SERVICE_UUID` and
// `ROKI_PACKET_CHARACTERISTIC_UUID`.
#[nrf_softdevice::gatt_service(uuid = "d0a37544-a8d9-462c-950a-43f103748eb4")]
pub struct RokiService {
    #[characteristic(uuid = "2c305b04-3ef7-4771-aa1a-3130d352f895", read, notify)]
    pub packet: [u8; LINK_MESSAGE_SIZE],
}

#[nrf_softdevice::gatt_server]
pub struct RokiServer {
    pub roki: RokiService,
}

#[nrf_softdevice::gatt_client(uuid = "d0a37544-a8d9-462c-950a-43f103748eb4")]
pub struct RokiClient {
    #[characteristic(uuid = "2c305b04-3ef7-4771-aa1a-3130d352f895", read, notify)]
    pub packet: [u8; LINK_MESSAGE_SIZE],
}

type SharedConnection = Mutex<CriticalSectionRawMutex, RefCell<Option<Connection>>>;

fn current(slot: &SharedConnection) -> Option<Connection> {
    slot.lock(|conn| conn.borrow().clone())
        .filter(|conn| conn.handle().is_some())
}

fn set(slot: &SharedConnection, conn: Option<Connection>) {
    slot.lock(|current| *current.borrow_mut() = conn);
}

// Secondary (peripheral)

/// Latest advertising request from the role loop.
static ADVERTISE: Signal<CriticalSectionRawMutex, bool> = Signal::new();

/// Connection to the primary, while one is up.
static PRIMARY_CONN: SharedConnection = Mutex::new(RefCell::new(None));

fn advertisement() -> (LegacyAdvertisementPayload, LegacyAdvertisementPayload) {
    let adv_data = LegacyAdvertisementBuilder::new()
        .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
        .services_128(ServiceList::Complete, &[ROKI_SERVICE_UUID128])
        .build();
    let scan_data = LegacyAdvertisementBuilder::new()
        .full_name(BLE_DEVICE_NAME)
        .build();
    (adv_data, scan_data)
}

/// Advertise the Roki service while requested and serve one primary at a
/// time.
#[embassy_executor::task]
pub async fn peripheral_task(sd: &'static Softdevice, server: &'static RokiServer) -> ! {
    let (adv_data, scan_data) = advertisement();
    let config = peripheral::Config::default();
    let mut wanted = false;

    loop {
        if !wanted {
            wanted = ADVERTISE.wait().await;
            continue;
        }

        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &adv_data,
            scan_data: &scan_data,
        };
        let conn = match select(peripheral::advertise_connectable(sd, adv, &config), ADVERTISE.wait()).await {
            Either::First(Ok(conn)) => conn,
            Either::First(Err(e)) => {
                warn!("advertising failed: {:?}", e);
                Timer::after(ADVERTISE_RETRY).await;
                continue;
            }
            Either::Second(request) => {
                wanted = request;
                continue;
            }
        };

        wanted = false;
        info!("primary connected over BLE");
        if set_sys_attrs(&conn, None).is_err() {
            debug!("no system attributes for this connection");
        }
        set(&PRIMARY_CONN, Some(conn.clone()));

        let reason = gatt_server::run(&conn, server, |event| match event {
            RokiServerEvent::Roki(RokiServiceEvent::PacketCccdWrite { notifications }) => {
                debug!("packet notifications: {}", notifications);
            }
        })
        .await;

        set(&PRIMARY_CONN, None);
        info!("primary link closed: {:?}", reason);
    }
}

/// [`PeerLink`] of the secondary half.
pub struct BlePeerLink {
    server: &'static RokiServer,
}

impl BlePeerLink {
    pub fn new(server: &'static RokiServer) -> Self {
        Self { server }
    }
}

impl PeerLink for BlePeerLink {
    fn is_connected(&self) -> bool {
        current(&PRIMARY_CONN).is_some()
    }

    fn start_advertising(&mut self) {
        ADVERTISE.signal(true);
    }

    fn stop_advertising(&mut self) {
        ADVERTISE.signal(false);
    }

    fn send(&mut self, frame: &Frame) -> Result<(), LinkError> {
        // Keep the value readable even before the primary subscribes.
        if self.server.roki.packet_set(frame).is_err() {
            return Err(LinkError::SendFailed);
        }
        let conn = current(&PRIMARY_CONN).ok_or(LinkError::NotConnected)?;
        self.server
            .roki
            .packet_notify(&conn, frame)
            .map_err(|_| LinkError::SendFailed)
    }
}

// Primary (central)

/// Set by the role loop when it wants a peer; consumed by [`central_task`].
static SCAN_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Connection to the secondary, once subscribed.
static SECONDARY_CONN: SharedConnection = Mutex::new(RefCell::new(None));

/// Frames notified by the secondary. New frames are dropped when full.
static FRAMES: Channel<CriticalSectionRawMutex, Frame, FRAME_QUEUE_DEPTH> = Channel::new();

fn peer_conn_params(interval_ms: f32) -> raw::ble_gap_conn_params_t {
    let units = connection_interval_units(interval_ms);
    raw::ble_gap_conn_params_t {
        min_conn_interval: units,
        max_conn_interval: units,
        slave_latency: 0,
        conn_sup_timeout: BLE_SUP_TIMEOUT,
    }
}

/// Find one advertiser of the Roki service within `SCAN_WINDOW`.
async fn scan_for_roki(sd: &Softdevice) -> Option<Address> {
    let config = central::ScanConfig {
        // Active scan to retrieve the scan response (name).
        active: true,
        ..Default::default()
    };
    let scan = central::scan(sd, &config, |params| {
        // SAFETY: the SoftDevice hands us a valid buffer for the duration
        // of the callback.
        let data =
            unsafe { core::slice::from_raw_parts(params.data.p_data, params.data.len as usize) };
        if !contains_service_uuid128(data, &ROKI_SERVICE_UUID128) {
            return None;
        }
        if let Some(name) = device_name(data) {
            debug!("found {}", name.as_str());
        }
        Some(Address::from_raw(params.peer_addr))
    });
    match select(scan, Timer::after(SCAN_WINDOW)).await {
        Either::First(Ok(address)) => Some(address),
        Either::First(Err(e)) => {
            warn!("BLE scan ended with error: {:?}", e);
            None
        }
        Either::Second(()) => None,
    }
}

/// Scan, connect and relay notifications whenever the role loop asks.
#[embassy_executor::task]
pub async fn central_task(sd: &'static Softdevice) -> ! {
    loop {
        SCAN_REQUEST.wait().await;
        debug!("scanning for secondary");
        let Some(address) = scan_for_roki(sd).await else {
            continue;
        };

        let whitelist = [&address];
        let conn_cfg = central::ConnectConfig {
            scan_config: central::ScanConfig {
                whitelist: Some(&whitelist),
                ..Default::default()
            },
            conn_params: peer_conn_params(PEER_CONNECTION_INTERVAL_MS),
            ..Default::default()
        };
        let conn = match central::connect(sd, &conn_cfg).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("connect to secondary failed: {:?}", e);
                continue;
            }
        };

        let client: RokiClient = match gatt_client::discover(&conn).await {
            Ok(client) => client,
            Err(e) => {
                warn!("Roki service not found: {:?}", e);
                continue;
            }
        };
        if let Err(e) = client.packet_cccd_write(true).await {
            warn!("subscribe failed: {:?}", e);
            continue;
        }

        // Frames from an earlier connection are stale.
        while FRAMES.try_receive().is_ok() {}
        set(&SECONDARY_CONN, Some(conn.clone()));
        info!("subscribed to secondary");

        let reason = gatt_client::run(&conn, &client, |event| match event {
            RokiClientEvent::PacketNotification(frame) => {
                // try_send avoids blocking; if the role loop is behind, we drop.
                if FRAMES.try_send(frame).is_err() {
                    warn!("frame queue full - dropping frame");
                }
            }
        })
        .await;

        set(&SECONDARY_CONN, None);
        info!("secondary link closed: {:?}", reason);
    }
}

/// [`CentralLink`] of the primary half.
pub struct BleCentral;

impl CentralLink for BleCentral {
    type Peer = Connection;
    type Connection = BlePeerConnection;

    /// Hands out the subscribed connection once [`central_task`] has one,
    /// otherwise (re)requests a scan.
    fn scan_for_peer(&mut self) -> Option<Connection> {
        let conn = current(&SECONDARY_CONN);
        if conn.is_none() {
            SCAN_REQUEST.signal(());
        }
        conn
    }

    fn connect(&mut self, peer: Connection, interval_ms: f32) -> Result<BlePeerConnection, LinkError> {
        if peer.handle().is_none() {
            return Err(LinkError::ConnectFailed);
        }
        if let Err(e) = peer.set_conn_params(peer_conn_params(interval_ms)) {
            debug!("connection interval update refused: {:?}", e);
        }
        Ok(BlePeerConnection { conn: peer })
    }
}

pub struct BlePeerConnection {
    conn: Connection,
}

impl PeerConnection for BlePeerConnection {
    fn is_connected(&self) -> bool {
        self.conn.handle().is_some()
    }

    fn try_receive_into(&mut self, buf: &mut Frame) -> usize {
        match FRAMES.try_receive() {
            Ok(frame) => {
                *buf = frame;
                frame.len()
            }
            Err(_) => 0,
        }
    }
}
