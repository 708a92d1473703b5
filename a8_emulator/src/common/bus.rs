//! Generic Bus trait implemented by the machine and by the test busses of each component.

use std::ops::RangeInclusive;

use crate::common::address::Address;
use crate::common::address::Wrap;

/// Generic trait shared by all bus implementations.
pub trait Bus<AddressT: Address> {
    /// Reads without side effects. Returns None for registers that cannot be peeked.
    fn peek_u8(&self, addr: AddressT) -> Option<u8>;
    fn read_u8(&mut self, addr: AddressT) -> u8;
    fn write_u8(&mut self, addr: AddressT, value: u8);
    fn reset(&mut self);

    #[inline]
    fn read_u16(&mut self, addr: AddressT, wrap: Wrap) -> u16 {
        u16::from_le_bytes([self.read_u8(addr), self.read_u8(addr.add(1, wrap))])
    }

    #[inline]
    fn peek_u16(&self, addr: AddressT, wrap: Wrap) -> Option<u16> {
        Some(u16::from_le_bytes([
            self.peek_u8(addr)?,
            self.peek_u8(addr.add(1, wrap))?,
        ]))
    }

    fn peek_range(&self, range: RangeInclusive<u16>) -> Vec<u8> {
        range
            .into_iter()
            .map(|idx| self.peek_u8(AddressT::from(idx)).unwrap_or_default())
            .collect()
    }
}
