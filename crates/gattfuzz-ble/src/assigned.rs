//! Human-readable names for Bluetooth SIG assigned UUIDs

use uuid::Uuid;

/// Bluetooth base UUID `00000000-0000-1000-8000-00805f9b34fb`
const BLUETOOTH_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5f9b_34fb;
const SHORT_UUID_MASK: u128 = 0xFFFF_FFFF << 96;

const KNOWN: &[(u32, &str)] = &[
    // Services
    (0x1800, "Generic Access"),
    (0x1801, "Generic Attribute"),
    (0x1802, "Immediate Alert"),
    (0x1803, "Link Loss"),
    (0x1804, "Tx Power"),
    (0x1805, "Current Time Service"),
    (0x180A, "Device Information"),
    (0x180D, "Heart Rate"),
    (0x180F, "Battery Service"),
    (0x1812, "Human Interface Device"),
    (0x1814, "Running Speed and Cadence"),
    (0x1816, "Cycling Speed and Cadence"),
    (0x181A, "Environmental Sensing"),
    (0x181C, "User Data"),
    (0xFE59, "Nordic DFU"),
    // Characteristics
    (0x2A00, "Device Name"),
    (0x2A01, "Appearance"),
    (0x2A04, "Peripheral Preferred Connection Parameters"),
    (0x2A05, "Service Changed"),
    (0x2A06, "Alert Level"),
    (0x2A07, "Tx Power Level"),
    (0x2A19, "Battery Level"),
    (0x2A23, "System ID"),
    (0x2A24, "Model Number String"),
    (0x2A25, "Serial Number String"),
    (0x2A26, "Firmware Revision String"),
    (0x2A27, "Hardware Revision String"),
    (0x2A28, "Software Revision String"),
    (0x2A29, "Manufacturer Name String"),
    (0x2A2B, "Current Time"),
    (0x2A37, "Heart Rate Measurement"),
    (0x2A38, "Body Sensor Location"),
    (0x2A39, "Heart Rate Control Point"),
    (0x2A4D, "Report"),
    (0x2A50, "PnP ID"),
    (0x2A6E, "Temperature"),
    (0x2A6F, "Humidity"),
    (0x2AA6, "Central Address Resolution"),
];

/// The 16/32-bit short form when `uuid` derives from the Bluetooth base UUID
pub fn short_uuid(uuid: &Uuid) -> Option<u32> {
    let value = uuid.as_u128();
    if value & !SHORT_UUID_MASK == BLUETOOTH_BASE_UUID {
        Some((value >> 96) as u32)
    } else {
        None
    }
}

/// Name for a service or characteristic uuid
pub fn describe(uuid: &Uuid) -> String {
    match short_uuid(uuid) {
        Some(short) => KNOWN
            .iter()
            .find(|(id, _)| *id == short)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| "Unknown".to_string()),
        None => "Vendor specific".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(short: u32) -> Uuid {
        Uuid::from_u128(BLUETOOTH_BASE_UUID | (u128::from(short) << 96))
    }

    #[test]
    fn test_known_uuids() {
        assert_eq!(describe(&sig(0x180F)), "Battery Service");
        assert_eq!(describe(&sig(0x2A19)), "Battery Level");
        assert_eq!(short_uuid(&sig(0x2A19)), Some(0x2A19));
    }

    #[test]
    fn test_unknown_and_vendor_uuids() {
        assert_eq!(describe(&sig(0xFFF0)), "Unknown");

        let nus = Uuid::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E);
        assert_eq!(short_uuid(&nus), None);
        assert_eq!(describe(&nus), "Vendor specific");
    }
}
