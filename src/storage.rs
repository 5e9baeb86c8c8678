//! Keymap persistence in the nRF52840's internal flash.
//!
//! Uses `sequential-storage`'s key-value map over a reserved page range.
//!
//! Storage layout:
//!   - `KEY_HEADER`: postcard-encoded `KeymapRecord` (side flag, layer
//!     count, column order).
//!   - `KEY_LAYER_BASE + i`: postcard-encoded `LayerRecord` of layer `i`.
//!
//! A blank board gets the built-in keymap written on first boot.

use defmt::{debug, error, info, warn};
use embedded_storage_async::nor_flash::NorFlash;
use heapless::Vec;
use roki::config::{
    DEFAULT_IS_LEFT_SIDE, MAX_LAYERS, STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START,
};
use roki::keymap::{default_header, default_layer, Keymap, KeymapRecord, Layer, LayerRecord};
use roki::{Error, Result};
use sequential_storage::cache::NoCache;
use sequential_storage::map::{fetch_item, store_item};
use static_cell::StaticCell;

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

const KEY_HEADER: u8 = 0x00;
const KEY_LAYER_BASE: u8 = 0x10;

/// Largest encoded record. A full layer of long multi-token keys still
/// fits comfortably.
const MAX_RECORD_SIZE: usize = 2048;

static ITEM_BUF: StaticCell<[u8; MAX_RECORD_SIZE]> = StaticCell::new();
static ENCODE_BUF: StaticCell<[u8; MAX_RECORD_SIZE]> = StaticCell::new();

fn layer_key(index: u8) -> u8 {
    KEY_LAYER_BASE + index
}

/// Keymap records on top of a flash driver.
pub struct KeymapStore<F> {
    flash: F,
    item_buf: &'static mut [u8; MAX_RECORD_SIZE],
    encode_buf: &'static mut [u8; MAX_RECORD_SIZE],
}

impl<F: NorFlash> KeymapStore<F> {
    /// Must be called exactly once; the record buffers are static.
    pub fn new(flash: F) -> Self {
        Self {
            flash,
            item_buf: ITEM_BUF.init([0u8; MAX_RECORD_SIZE]),
            encode_buf: ENCODE_BUF.init([0u8; MAX_RECORD_SIZE]),
        }
    }

    /// Load the stored keymap, writing the built-in one first if the flash
    /// holds none.
    pub async fn load_or_init(&mut self) -> Result<(KeymapRecord, Keymap)> {
        if let Some(loaded) = self.load().await? {
            return Ok(loaded);
        }
        warn!("no keymap in flash, storing the built-in one");
        let header = default_header(DEFAULT_IS_LEFT_SIDE);
        for index in 0..header.layer_count {
            let record = default_layer(index as usize)?;
            self.store(layer_key(index), |buf| record.encode_into(buf)).await?;
        }
        self.store(KEY_HEADER, |buf| header.encode_into(buf)).await?;
        self.load().await?.ok_or(Error::Storage)
    }

    /// Read the header, then resolve each layer record as it is read.
    pub async fn load(&mut self) -> Result<Option<(KeymapRecord, Keymap)>> {
        let Some(header) = self.fetch(KEY_HEADER, KeymapRecord::decode).await? else {
            return Ok(None);
        };
        debug!("keymap header: {}", header);

        let mut layers: Vec<Layer, MAX_LAYERS> = Vec::new();
        for index in 0..header.layer_count {
            let Some(record) = self.fetch(layer_key(index), LayerRecord::decode).await? else {
                error!("layer {} of {} missing from flash", index, header.layer_count);
                return Err(Error::Storage);
            };
            let layer = record.build(header.column_order)?;
            layers.push(layer).map_err(|_| Error::TooManyLayers)?;
        }

        let keymap = Keymap::new(layers)?;
        info!("loaded {} layers from flash", keymap.layer_count());
        Ok(Some((header, keymap)))
    }

    async fn fetch<T>(
        &mut self,
        key: u8,
        decode: impl FnOnce(&[u8]) -> Result<T>,
    ) -> Result<Option<T>> {
        let item = fetch_item::<u8, &[u8], _>(
            &mut self.flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut self.item_buf[..],
            &key,
        )
        .await
        .map_err(|e| {
            error!("Flash read error: {:?}", defmt::Debug2Format(&e));
            Error::Storage
        })?;
        item.map(decode).transpose()
    }

    async fn store(
        &mut self,
        key: u8,
        encode: impl FnOnce(&mut [u8]) -> Result<&mut [u8]>,
    ) -> Result<()> {
        let item: &[u8] = encode(&mut self.encode_buf[..])?;
        store_item::<u8, &[u8], _>(
            &mut self.flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut self.item_buf[..],
            &key,
            &item,
        )
        .await
        .map_err(|e| {
            error!("Flash write error: {:?}", defmt::Debug2Format(&e));
            Error::Storage
        })?;
        debug!("stored record {} ({} bytes)", key, item.len());
        Ok(())
    }
}
