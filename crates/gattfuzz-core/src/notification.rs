//! Latest-notification bookkeeping

use std::collections::HashMap;

use uuid::Uuid;

/// Characteristic uuid -> most recently delivered payload
#[derive(Debug, Clone, Default)]
pub struct NotificationRecord {
    latest: HashMap<Uuid, Vec<u8>>,
}

impl NotificationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a delivery, replacing any earlier one for the same characteristic
    pub fn record(&mut self, uuid: Uuid, value: Vec<u8>) {
        self.latest.insert(uuid, value);
    }

    pub fn latest(&self, uuid: &Uuid) -> Option<&[u8]> {
        self.latest.get(uuid).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut record = NotificationRecord::new();
        let x = Uuid::from_u128(0x10);
        let y = Uuid::from_u128(0x11);

        record.record(x, b"A".to_vec());
        record.record(y, b"other".to_vec());
        record.record(x, b"B".to_vec());

        assert_eq!(record.latest(&x), Some(&b"B"[..]));
        assert_eq!(record.latest(&y), Some(&b"other"[..]));
        assert_eq!(record.len(), 2);
    }
}
