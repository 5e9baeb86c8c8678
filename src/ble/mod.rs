//! Bluetooth Low Energy subsystem (Nordic SoftDevice S140).
//!
//! Both halves enable the SoftDevice; the side decides which role the
//! split link uses:
//!
//! 1. **Secondary** - peripheral. Advertises the Roki service and notifies
//!    every link frame on its packet characteristic.
//! 2. **Primary** - central. Scans for the Roki service, connects at the
//!    desired interval and queues notified frames for the role loop.
//!
//! The role loop never awaits the radio; it talks to the tasks in
//! [`peer`] through embassy-sync primitives.

pub mod peer;

use core::mem;

use defmt::info;
use embassy_nrf::usb::vbus_detect::SoftwareVbusDetect;
use nrf_softdevice::{raw, Config, SocEvent, Softdevice};
use roki::config::BLE_DEVICE_NAME;

/// SoftDevice configuration: one peripheral and one central link.
pub fn softdevice_config() -> Config {
    Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 2,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 23 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 1,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: BLE_DEVICE_NAME.as_ptr() as _,
            current_len: BLE_DEVICE_NAME.len() as u16,
            max_len: BLE_DEVICE_NAME.len() as u16,
            // SAFETY: an all-zero security mode is "no access", which
            // keeps the name read-only.
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

/// Background task of the SoftDevice. Also forwards USB power events,
/// since the SoftDevice owns the POWER peripheral.
#[embassy_executor::task]
pub async fn softdevice_task(sd: &'static Softdevice, vbus: &'static SoftwareVbusDetect) -> ! {
    // SAFETY: plain SoftDevice calls, made once the SoftDevice is enabled.
    unsafe {
        raw::sd_power_usbpwrrdy_enable(1);
        raw::sd_power_usbdetected_enable(1);
        raw::sd_power_usbremoved_enable(1);
    }
    info!("SoftDevice running");

    sd.run_with_callback(|event: SocEvent| match event {
        SocEvent::PowerUsbRemoved => vbus.detected(false),
        SocEvent::PowerUsbDetected => vbus.detected(true),
        SocEvent::PowerUsbPowerReady => vbus.ready(),
        _ => {}
    })
    .await
}
