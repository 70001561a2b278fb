//! DAB service directory
//!
//! Entities and wire decoder for the receiver's digital service list.
//!
//! The list payload is the `GET_DIGITAL_SERVICE_LIST` reply without its
//! 4-byte status header:
//!
//! ```text
//! 0   size: u16        2   version: u16
//! 4   service count    5   reserved (3)
//! 8   service records, back to back:
//!       +0  service_id: u32
//!       +4  info1 (data flag, programme type)
//!       +5  info2 (low nibble = component count)
//!       +6  padding (2)
//!       +8  label (16)
//!       +24 component records, 8 bytes each:
//!             +0 component_id: u32   +4 reserved (3)   +7 info
//! ```

use core::fmt;

use heapless::Vec;

use crate::config::{MAX_COMPONENTS, MAX_SERVICES};
use crate::error::{Error, Result};

/// Length of a service label
pub const LABEL_LEN: usize = 16;

/// Offset of the first service record in the payload
const SERVICES_OFFSET: usize = 8;

/// Offset of the declared service count
const COUNT_OFFSET: usize = 4;

/// Fixed part of a service record
const SERVICE_HEADER_LEN: usize = 24;

/// Size of one component record
const COMPONENT_LEN: usize = 8;

/// A sub-stream of a service (audio or data)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Component {
    /// Component identifier
    pub component_id: u32,
    /// Raw info byte: bit 7 conditional access, bit 6 secondary, bits 0-5 type
    pub info: u8,
}

impl Component {
    /// Create a component
    #[must_use]
    pub const fn new(component_id: u32, info: u8) -> Self {
        Self { component_id, info }
    }

    /// Component is scrambled
    #[must_use]
    pub const fn conditional_access(&self) -> bool {
        self.info & 0x80 != 0
    }

    /// Primary component of its service
    #[must_use]
    pub const fn is_primary(&self) -> bool {
        self.info & 0x40 == 0
    }

    /// 6-bit component type
    #[must_use]
    pub const fn component_type(&self) -> u8 {
        self.info & 0x3F
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Component {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Component({:#x}, type {})", self.component_id, self.component_type());
    }
}

/// Components of one service
pub type Components = Vec<Component, MAX_COMPONENTS>;

/// A broadcast service found in an ensemble
///
/// Identity is the service id together with the ensemble's frequency index:
/// the same id may be carried on several ensembles.
#[derive(Clone, PartialEq, Eq)]
pub struct Service {
    frequency_index: u8,
    service_id: u32,
    info1: u8,
    info2: u8,
    label: [u8; LABEL_LEN],
    components: Components,
}

impl Service {
    /// Build a service, checking that the component count nibble of `info2`
    /// matches `components`
    pub fn new(
        frequency_index: u8,
        service_id: u32,
        info1: u8,
        info2: u8,
        label: [u8; LABEL_LEN],
        components: Components,
    ) -> Result<Self> {
        if usize::from(info2 & 0x0F) != components.len() {
            return Err(Error::Malformed);
        }
        Ok(Self {
            frequency_index,
            service_id,
            info1,
            info2,
            label,
            components,
        })
    }

    /// Index of the ensemble frequency this service was found on
    #[must_use]
    pub const fn frequency_index(&self) -> u8 {
        self.frequency_index
    }

    /// Service identifier
    #[must_use]
    pub const fn service_id(&self) -> u32 {
        self.service_id
    }

    /// Raw programme-type / data-flag byte
    #[must_use]
    pub const fn info1(&self) -> u8 {
        self.info1
    }

    /// Raw component-count byte
    #[must_use]
    pub const fn info2(&self) -> u8 {
        self.info2
    }

    /// Data service rather than audio
    #[must_use]
    pub const fn is_data(&self) -> bool {
        self.info1 & 0x01 != 0
    }

    /// Programme type code
    #[must_use]
    pub const fn programme_type(&self) -> u8 {
        (self.info1 >> 1) & 0x1F
    }

    /// Number of components
    #[must_use]
    pub const fn num_components(&self) -> usize {
        (self.info2 & 0x0F) as usize
    }

    /// Raw 16-byte label
    #[must_use]
    pub const fn label(&self) -> &[u8; LABEL_LEN] {
        &self.label
    }

    /// Label as text with trailing padding removed, None if not UTF-8
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        core::str::from_utf8(&self.label)
            .ok()
            .map(|s| s.trim_end_matches(|c: char| c == ' ' || c == '\0'))
    }

    /// Components in broadcast order
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Component played when the service is selected
    #[must_use]
    pub fn primary_component(&self) -> Option<&Component> {
        self.components
            .iter()
            .find(|c| c.is_primary())
            .or_else(|| self.components.first())
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("frequency_index", &self.frequency_index)
            .field("service_id", &format_args!("{:#010X}", self.service_id))
            .field("name", &self.name())
            .field("components", &self.components)
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Service {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Service({:#x} @{}, {} components)",
            self.service_id,
            self.frequency_index,
            self.components.len()
        );
    }
}

/// Services of one ensemble, in list order
pub type ServiceList = Vec<Service, MAX_SERVICES>;

/// Little-endian u32 at `offset`
fn u32_at(data: &[u8], offset: usize) -> Result<u32> {
    let b = data.get(offset..offset + 4).ok_or(Error::Malformed)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Decode a service list payload.
///
/// Produces exactly the declared number of services, each tagged with
/// `frequency_index`. A list that declares more services than
/// [`MAX_SERVICES`] fails with [`Error::Allocation`]; a payload that ends
/// inside a record fails with [`Error::Malformed`]. Neither case returns a
/// partial list.
pub fn decode_service_list(payload: &[u8], frequency_index: u8) -> Result<ServiceList> {
    let count = usize::from(*payload.get(COUNT_OFFSET).ok_or(Error::Malformed)?);
    if count > MAX_SERVICES {
        return Err(Error::Allocation {
            requested: count,
            capacity: MAX_SERVICES,
        });
    }

    let mut list = ServiceList::new();
    let mut offset = SERVICES_OFFSET;
    for _ in 0..count {
        let header = payload
            .get(offset..offset + SERVICE_HEADER_LEN)
            .ok_or(Error::Malformed)?;
        let service_id = u32_at(header, 0)?;
        let info1 = header[4];
        let info2 = header[5];
        let mut label = [0u8; LABEL_LEN];
        label.copy_from_slice(&header[8..8 + LABEL_LEN]);
        offset += SERVICE_HEADER_LEN;

        let num_comp = usize::from(info2 & 0x0F);
        let mut components = Components::new();
        for _ in 0..num_comp {
            let record = payload
                .get(offset..offset + COMPONENT_LEN)
                .ok_or(Error::Malformed)?;
            let component = Component::new(u32_at(record, 0)?, record[7]);
            components.push(component).map_err(|_| Error::Allocation {
                requested: num_comp,
                capacity: MAX_COMPONENTS,
            })?;
            offset += COMPONENT_LEN;
        }

        let service = Service::new(frequency_index, service_id, info1, info2, label, components)?;
        list.push(service).map_err(|_| Error::Allocation {
            requested: count,
            capacity: MAX_SERVICES,
        })?;
    }

    Ok(list)
}
