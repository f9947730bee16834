//! NVS-backed settings storage.

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_svc::sys::EspError;

use crate::traits::SettingsStore;

const NAMESPACE: &str = "garage";
const KEY: &str = "config";

/// Stores the settings document as one blob in the default NVS partition.
pub struct NvsSettingsStore {
    nvs: EspNvs<NvsDefault>,
}

impl NvsSettingsStore {
    /// Open the `garage` namespace read-write.
    pub fn new(partition: EspDefaultNvsPartition) -> Result<Self, EspError> {
        Ok(Self {
            nvs: EspNvs::new(partition, NAMESPACE, true)?,
        })
    }
}

impl SettingsStore for NvsSettingsStore {
    type Error = EspError;

    fn load(&mut self, buf: &mut [u8]) -> Result<Option<usize>, EspError> {
        Ok(self.nvs.get_blob(KEY, buf)?.map(|data| data.len()))
    }

    fn save(&mut self, data: &[u8]) -> Result<(), EspError> {
        self.nvs.set_blob(KEY, data)
    }
}
