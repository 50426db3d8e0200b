//! Module for bit level manipulation.

pub trait SetBit {
	fn set_bit(self, index: usize, on: bool) -> Self;
}

pub trait GetBit {
	fn get_bit(self, index: usize) -> bool;
}

/// The number of bits needed to represent a value.
/// `0.bit_length() == 0`, `255.bit_length() == 8`
pub trait BitLength {
	fn bit_length(self) -> u32;
}

macro_rules! __get_set_impl {
	($type:ty) => {

		impl SetBit for $type {
			fn set_bit(self, index: usize, on: bool) -> Self {
				if on {
					self | (1 << index)
				} else {
					self & !(1 << index)
				}
			}
		}

		impl GetBit for $type {
			fn get_bit(self, index: usize) -> bool {
				(self & (1 << index)) != 0
			}
		}

		impl BitLength for $type {
			fn bit_length(self) -> u32 {
				<$type>::BITS - self.leading_zeros()
			}
		}

	};
}

crate::for_each_int_type!(__get_set_impl;unsigned);

/// The number of bits each index needs for a palette of `palette_len`
/// entries, never less than `minimum`.
pub fn palette_bits(palette_len: usize, minimum: u32) -> u32 {
	palette_len.saturating_sub(1)
		.bit_length()
		.max(minimum)
		.max(1)
}
