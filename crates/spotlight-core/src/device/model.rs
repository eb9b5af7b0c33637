//! The closed set of supported presenter remotes.
//!
//! Each variant bundles everything the daemon needs to drive one device
//! class: how to recognise its nodes, how its raw reports are shaped, which
//! codes map to which buttons, and the gesture timing that feels right on
//! that hardware.  Adding a remote means adding a variant here.

use std::fmt;
use std::time::Duration;

use super::buttons::{Button, ButtonMap, BASEUS_BUTTONS, VRBOX_BUTTONS};
use super::signature::DeviceSignature;
use crate::gesture::profile::GestureProfile;
use crate::protocol::packet::PacketShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceModel {
    /// Baseus Orange Dot AI wireless presenter (2.4 GHz dongle).
    BaseusOrangeDotAi,
    /// Generic "VR BOX" Bluetooth remote.
    GenericVrBox,
}

impl DeviceModel {
    pub const ALL: [DeviceModel; 2] = [DeviceModel::BaseusOrangeDotAi, DeviceModel::GenericVrBox];

    /// Human-readable product name.
    pub fn name(self) -> &'static str {
        match self {
            DeviceModel::BaseusOrangeDotAi => "Baseus Orange Dot AI",
            DeviceModel::GenericVrBox => "Generic VR BOX",
        }
    }

    /// Short key used in configuration tables.
    pub fn key(self) -> &'static str {
        match self {
            DeviceModel::BaseusOrangeDotAi => "baseus",
            DeviceModel::GenericVrBox => "vrbox",
        }
    }

    /// Inverse of [`key`](Self::key).
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }

    pub fn signature(self) -> DeviceSignature {
        match self {
            DeviceModel::BaseusOrangeDotAi => DeviceSignature::new(0xABC8, 0xCA08),
            DeviceModel::GenericVrBox => DeviceSignature::new(0x248A, 0x8266),
        }
    }

    /// Shape of the raw HID status report, for models that speak one.
    /// Models without it are driven purely from evdev key events.
    pub fn packet_shape(self) -> Option<PacketShape> {
        match self {
            DeviceModel::BaseusOrangeDotAi => Some(PacketShape {
                length: 16,
                header: 10,
                terminator: 182,
                status_offset: 5,
            }),
            DeviceModel::GenericVrBox => None,
        }
    }

    pub fn buttons(self) -> ButtonMap {
        match self {
            DeviceModel::BaseusOrangeDotAi => BASEUS_BUTTONS,
            DeviceModel::GenericVrBox => VRBOX_BUTTONS,
        }
    }

    /// Whether key events from this model's event nodes are gestures.  When
    /// `false`, event nodes only contribute pointer passthrough.
    pub fn keys_from_event_nodes(self) -> bool {
        self.packet_shape().is_none()
    }

    /// Default gesture timing and button roles.
    pub fn profile(self) -> GestureProfile {
        match self {
            DeviceModel::BaseusOrangeDotAi => GestureProfile {
                double_tap: Duration::from_millis(300),
                long_press: Duration::from_millis(600),
                repeat_interval: Duration::from_millis(50),
                repeatable: vec![
                    Button::Laser,
                    Button::Prev,
                    Button::Next,
                    Button::VolumeUp,
                    Button::VolumeDown,
                    Button::ColorNext,
                    Button::ColorPrev,
                ],
                combos: Vec::new(),
            },
            DeviceModel::GenericVrBox => GestureProfile {
                double_tap: Duration::from_millis(400),
                long_press: Duration::from_millis(600),
                repeat_interval: Duration::from_millis(100),
                repeatable: vec![Button::ScrollLeft, Button::ScrollRight],
                combos: vec![(Button::G1, Button::G2)],
            },
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::signature::{DeviceDescriptor, NodeKind};

    #[test]
    fn test_each_model_recognises_only_its_own_ids() {
        // Arrange
        let baseus = DeviceDescriptor::new("HID_ID=0003:0000ABC8:0000CA08", None);

        // Act / Assert
        assert!(DeviceModel::BaseusOrangeDotAi
            .signature()
            .matches(&baseus, NodeKind::Raw));
        assert!(!DeviceModel::GenericVrBox
            .signature()
            .matches(&baseus, NodeKind::Raw));
    }

    #[test]
    fn test_repeatable_buttons_exist_in_button_map() {
        for model in DeviceModel::ALL {
            let known = model.buttons().buttons();
            for b in model.profile().repeatable {
                assert!(known.contains(&b), "{model}: {b} not in map");
            }
        }
    }

    #[test]
    fn test_from_key_round_trips_config_keys() {
        assert_eq!(DeviceModel::from_key("vrbox"), Some(DeviceModel::GenericVrBox));
        assert_eq!(DeviceModel::from_key("logitech"), None);
    }

    #[test]
    fn test_only_vrbox_takes_keys_from_event_nodes() {
        assert!(!DeviceModel::BaseusOrangeDotAi.keys_from_event_nodes());
        assert!(DeviceModel::GenericVrBox.keys_from_event_nodes());
    }
}
