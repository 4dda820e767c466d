// Sparse addressable memory image
//
// A codeplug is not one contiguous buffer: each radio family populates
// scattered regions of a flat device address space. An `Image` is an
// ordered set of non-overlapping `Element`s, each an independently
// allocated byte range keyed by its start address. Vendor codecs
// allocate exactly the regions a transfer needs, and the transfer layer
// walks the sorted elements in address order.

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ImageError {
    #[error("element at {address:#010x} would overlap an existing element")]
    Overlap { address: u32 },

    #[error(
        "element at {address:#010x} re-added with size {requested} (allocated {allocated})"
    )]
    SizeMismatch {
        address: u32,
        allocated: usize,
        requested: usize,
    },

    #[error("no element covers address {0:#010x}")]
    NotAllocated(u32),

    #[error("element at {address:#010x} (size {size}) is not aligned to {block}-byte blocks")]
    NotAligned { address: u32, size: usize, block: usize },
}

pub type Result<T> = std::result::Result<T, ImageError>;

/// One allocated byte range of an image: `[address, address + len)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    address: u32,
    data: Vec<u8>,
}

impl Element {
    pub fn new(address: u32, size: usize) -> Self {
        Self {
            address,
            data: vec![0u8; size],
        }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Does this element's range contain `address`?
    pub fn contains(&self, address: u32) -> bool {
        address >= self.address && (address as u64) < self.address as u64 + self.data.len() as u64
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Both address and size are exact multiples of `block`.
    pub fn is_aligned(&self, block: usize) -> bool {
        block > 0 && self.address as usize % block == 0 && self.data.len() % block == 0
    }
}

/// A named, ordered collection of non-overlapping elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    name: String,
    elements: Vec<Element>,
}

impl Image {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn element(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn element_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.elements.get_mut(index)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Allocate a zero-initialized element at `address`.
    ///
    /// Idempotent for an exact re-add: re-requesting the same address
    /// with the same size returns without touching the existing data.
    /// The same address with a different size is a layout-table bug and
    /// fails loudly; so does any overlap with a neighboring element.
    pub fn add_element(&mut self, address: u32, size: usize) -> Result<&mut Element> {
        if let Some(idx) = self.elements.iter().position(|e| e.address == address) {
            let existing = &self.elements[idx];
            if existing.len() != size {
                return Err(ImageError::SizeMismatch {
                    address,
                    allocated: existing.len(),
                    requested: size,
                });
            }
            return Ok(&mut self.elements[idx]);
        }

        let new_end = address as u64 + size as u64;
        for e in &self.elements {
            let e_end = e.address as u64 + e.len() as u64;
            if (address as u64) < e_end && new_end > e.address as u64 {
                return Err(ImageError::Overlap { address });
            }
        }

        self.elements.push(Element::new(address, size));
        let idx = self.elements.len() - 1;
        Ok(&mut self.elements[idx])
    }

    /// The element whose range contains `address`, if any.
    pub fn element_at(&self, address: u32) -> Option<&Element> {
        self.elements.iter().find(|e| e.contains(address))
    }

    pub fn element_at_mut(&mut self, address: u32) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.contains(address))
    }

    /// Immutable view into an allocated element, starting at `address`.
    pub fn data(&self, address: u32) -> Result<&[u8]> {
        let e = self
            .element_at(address)
            .ok_or(ImageError::NotAllocated(address))?;
        let offset = (address - e.address()) as usize;
        Ok(&e.data()[offset..])
    }

    /// Mutable view into an allocated element, starting at `address`.
    pub fn data_mut(&mut self, address: u32) -> Result<&mut [u8]> {
        let e = self
            .element_at_mut(address)
            .ok_or(ImageError::NotAllocated(address))?;
        let offset = (address - e.address()) as usize;
        Ok(&mut e.data_mut()[offset..])
    }

    /// Copy `bytes` into the image at `address`. The target range must
    /// lie within a single allocated element.
    pub fn write(&mut self, address: u32, bytes: &[u8]) -> Result<()> {
        let dest = self.data_mut(address)?;
        if dest.len() < bytes.len() {
            return Err(ImageError::NotAllocated(address + dest.len() as u32));
        }
        dest[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Reorder elements by ascending address. Required before
    /// sequential device I/O.
    pub fn sort(&mut self) {
        self.elements.sort_by_key(|e| e.address);
    }

    /// Every element's address and size are multiples of `block`.
    pub fn is_aligned(&self, block: usize) -> bool {
        self.elements.iter().all(|e| e.is_aligned(block))
    }

    /// First element violating `block` alignment, as an error.
    pub fn check_aligned(&self, block: usize) -> Result<()> {
        match self.elements.iter().find(|e| !e.is_aligned(block)) {
            Some(e) => Err(ImageError::NotAligned {
                address: e.address(),
                size: e.len(),
                block,
            }),
            None => Ok(()),
        }
    }

    /// Total number of payload bytes across all elements.
    pub fn total_size(&self) -> usize {
        self.elements.iter().map(|e| e.len()).sum()
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Image \"{}\": {} elements, {} bytes",
            self.name,
            self.num_elements(),
            self.total_size()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_element_idempotent() {
        let mut img = Image::new("test");
        img.add_element(0x1000, 16).unwrap();
        img.data_mut(0x1000).unwrap()[0] = 0x42;

        // Exact re-add returns the existing buffer untouched.
        let again = img.add_element(0x1000, 16).unwrap();
        assert_eq!(again.data()[0], 0x42);
        assert_eq!(img.num_elements(), 1);
    }

    #[test]
    fn test_add_element_size_mismatch() {
        let mut img = Image::new("test");
        img.add_element(0x1000, 16).unwrap();
        assert_eq!(
            img.add_element(0x1000, 32).unwrap_err(),
            ImageError::SizeMismatch {
                address: 0x1000,
                allocated: 16,
                requested: 32
            }
        );
    }

    #[test]
    fn test_overlap_rejected() {
        let mut img = Image::new("test");
        img.add_element(0x1000, 16).unwrap();
        assert!(matches!(
            img.add_element(0x1008, 16),
            Err(ImageError::Overlap { .. })
        ));
        // Adjacent is fine: ranges are half-open.
        img.add_element(0x1010, 16).unwrap();
    }

    #[test]
    fn test_sort_orders_by_address() {
        let mut img = Image::new("test");
        img.add_element(0x2000, 16).unwrap();
        img.add_element(0x1000, 16).unwrap();
        img.add_element(0x1010, 16).unwrap();
        img.sort();
        let addrs: Vec<u32> = img.elements().iter().map(|e| e.address()).collect();
        assert_eq!(addrs, vec![0x1000, 0x1010, 0x2000]);
    }

    #[test]
    fn test_interior_data_access() {
        let mut img = Image::new("test");
        img.add_element(0x1000, 64).unwrap();
        img.write(0x1010, &[1, 2, 3, 4]).unwrap();
        assert_eq!(&img.data(0x1010).unwrap()[..4], &[1, 2, 3, 4]);
        assert_eq!(img.data(0x1000).unwrap()[0x10], 1);
        assert!(img.data(0x3000).is_err());
    }

    #[test]
    fn test_alignment() {
        let mut img = Image::new("test");
        img.add_element(0x1000, 64).unwrap();
        assert!(img.is_aligned(16));
        assert!(img.check_aligned(16).is_ok());

        img.add_element(0x2001, 16).unwrap();
        assert!(!img.is_aligned(16));
        assert!(matches!(
            img.check_aligned(16),
            Err(ImageError::NotAligned { address: 0x2001, .. })
        ));
    }

    #[test]
    fn test_element_contains() {
        let e = Element::new(0x100, 0x10);
        assert!(e.contains(0x100));
        assert!(e.contains(0x10F));
        assert!(!e.contains(0x110));
        assert!(!e.contains(0xFF));
    }
}
