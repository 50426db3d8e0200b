//! Fixed-width unsigned integers packed into 64-bit words.
//!
//! Two layouts exist in region files. [PackedBitArray] lets values
//! straddle word boundaries (used between 17w47a and 20w17a), while
//! [PaddedBitArray] keeps every value inside a single word and leaves
//! the high bits of each word unused (20w17a onward).

use crate::{McError, McResult};

/// Common interface of the two bit array layouts.
pub trait BitArray {
	/// Width in bits of each slot.
	fn bits(&self) -> u32;
	/// Number of slots.
	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn get(&self, index: usize) -> McResult<u32>;
	fn set(&mut self, index: usize, value: u32) -> McResult<()>;
	/// Sets the slot at `index`, returning the value that was there before.
	fn replace(&mut self, index: usize, value: u32) -> McResult<u32>;
}

#[inline(always)]
fn validate_bits(bits: u32) -> McResult<()> {
	if (1..=32).contains(&bits) {
		Ok(())
	} else {
		Err(McError::InvalidBitWidth(bits))
	}
}

#[inline(always)]
fn validate_value(value: u32, bits: u32) -> McResult<()> {
	if bits < 32 && (value >> bits) != 0 {
		Err(McError::ValueOutOfRange { value, bits })
	} else {
		Ok(())
	}
}

#[inline(always)]
fn validate_index(index: usize, len: usize) -> McResult<()> {
	if index < len {
		Ok(())
	} else {
		Err(McError::IndexOutOfBounds { index, len })
	}
}

#[inline(always)]
const fn mask(bits: u32) -> u64 {
	(1u64 << bits) - 1
}

/// Values are laid out back to back, so a value may begin in one word
/// and end in the next. Bit `i * bits` of the stream is the lowest bit
/// of slot `i`, and bit `k` of the stream lives in bit `k % 64` of
/// word `k / 64`.
///
/// The storage can be owned (`Vec<u64>`) or borrowed from somewhere
/// else (`&mut [u64]`), in which case writes go straight to the
/// borrowed words.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackedBitArray<S = Vec<u64>> {
	words: S,
	bits: u32,
	len: usize,
}

impl PackedBitArray<Vec<u64>> {
	/// Creates a zeroed array with `len` slots of `bits` width.
	pub fn new(bits: u32, len: usize) -> McResult<Self> {
		validate_bits(bits)?;
		let words = Self::required_words(bits, len)?;
		Ok(Self {
			words: vec![0; words],
			bits,
			len,
		})
	}

	/// A zeroed array that can't fail, with the width clamped to `1..=32`.
	pub fn zeroed(bits: u32, len: usize) -> Self {
		let bits = bits.clamp(1, 32);
		Self {
			words: vec![0; (len.saturating_mul(bits as usize) + 63) / 64],
			bits,
			len,
		}
	}

	/// Creates an array from an iterator of values.
	pub fn from_values<I: IntoIterator<Item = u32>>(bits: u32, len: usize, values: I) -> McResult<Self> {
		let mut array = Self::new(bits, len)?;
		for (index, value) in values.into_iter().take(len).enumerate() {
			array.set(index, value)?;
		}
		Ok(array)
	}
}

impl<S: AsRef<[u64]>> PackedBitArray<S> {
	/// The number of words needed to hold `len` values of `bits` width.
	pub fn required_words(bits: u32, len: usize) -> McResult<usize> {
		len.checked_mul(bits as usize)
			.map(|total| (total + 63) / 64)
			.ok_or_else(|| McError::Custom(format!("{len} slots of {bits} bits overflow the address space")))
	}

	/// Wraps existing words. Fails if there are fewer words than `len`
	/// slots need.
	pub fn from_words(bits: u32, len: usize, words: S) -> McResult<Self> {
		validate_bits(bits)?;
		let required = Self::required_words(bits, len)?;
		let actual = words.as_ref().len();
		if actual < required {
			return Err(McError::BufferTooSmall { required, actual });
		}
		Ok(Self {
			words,
			bits,
			len,
		})
	}

	pub fn words(&self) -> &[u64] {
		self.words.as_ref()
	}

	pub fn into_words(self) -> S {
		self.words
	}

	/// Copies the array into owned storage that shares nothing with `self`.
	pub fn to_owned_array(&self) -> PackedBitArray<Vec<u64>> {
		PackedBitArray {
			words: self.words.as_ref().to_vec(),
			bits: self.bits,
			len: self.len,
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
		(0..self.len).map(|index| self.get_unchecked(index))
	}

	#[inline]
	fn get_unchecked(&self, index: usize) -> u32 {
		let words = self.words.as_ref();
		let start = index * self.bits as usize;
		let word = start >> 6;
		let offset = (start & 63) as u32;
		let value = if offset + self.bits <= 64 {
			words[word] >> offset
		} else {
			// offset is above 32 here, so both shifts are in range.
			(words[word] >> offset) | (words[word + 1] << (64 - offset))
		};
		(value & mask(self.bits)) as u32
	}
}

impl<S: AsRef<[u64]> + AsMut<[u64]>> PackedBitArray<S> {
	#[inline]
	fn set_unchecked(&mut self, index: usize, value: u32) {
		let bits = self.bits;
		let value = value as u64;
		let words = self.words.as_mut();
		let start = index * bits as usize;
		let word = start >> 6;
		let offset = (start & 63) as u32;
		words[word] = (words[word] & !(mask(bits) << offset)) | (value << offset);
		if offset + bits > 64 {
			let low_bits = 64 - offset;
			let high_mask = mask(bits - low_bits);
			words[word + 1] = (words[word + 1] & !high_mask) | (value >> low_bits);
		}
	}
}

impl<S: AsRef<[u64]> + AsMut<[u64]>> BitArray for PackedBitArray<S> {
	fn bits(&self) -> u32 {
		self.bits
	}

	fn len(&self) -> usize {
		self.len
	}

	fn get(&self, index: usize) -> McResult<u32> {
		validate_index(index, self.len)?;
		Ok(self.get_unchecked(index))
	}

	fn set(&mut self, index: usize, value: u32) -> McResult<()> {
		validate_index(index, self.len)?;
		validate_value(value, self.bits)?;
		self.set_unchecked(index, value);
		Ok(())
	}

	fn replace(&mut self, index: usize, value: u32) -> McResult<u32> {
		validate_index(index, self.len)?;
		validate_value(value, self.bits)?;
		let old = self.get_unchecked(index);
		self.set_unchecked(index, value);
		Ok(old)
	}
}

/// Every word holds `64 / bits` values starting from the lowest bit.
/// Leftover high bits in each word are never touched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaddedBitArray {
	words: Vec<u64>,
	bits: u32,
	len: usize,
}

impl PaddedBitArray {
	pub fn new(bits: u32, len: usize) -> McResult<Self> {
		validate_bits(bits)?;
		Ok(Self {
			words: vec![0; Self::required_words(bits, len)],
			bits,
			len,
		})
	}

	pub fn from_values<I: IntoIterator<Item = u32>>(bits: u32, len: usize, values: I) -> McResult<Self> {
		let mut array = Self::new(bits, len)?;
		for (index, value) in values.into_iter().take(len).enumerate() {
			array.set(index, value)?;
		}
		Ok(array)
	}

	pub fn from_words(bits: u32, len: usize, words: Vec<u64>) -> McResult<Self> {
		validate_bits(bits)?;
		let required = Self::required_words(bits, len);
		if words.len() < required {
			return Err(McError::BufferTooSmall { required, actual: words.len() });
		}
		Ok(Self {
			words,
			bits,
			len,
		})
	}

	/// Values stored per 64-bit word.
	pub const fn values_per_word(bits: u32) -> usize {
		(64 / bits) as usize
	}

	pub fn required_words(bits: u32, len: usize) -> usize {
		let per_word = Self::values_per_word(bits);
		(len + per_word - 1) / per_word
	}

	pub fn words(&self) -> &[u64] {
		&self.words
	}

	pub fn into_words(self) -> Vec<u64> {
		self.words
	}

	pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
		(0..self.len).map(|index| self.get_unchecked(index))
	}

	#[inline(always)]
	fn locate(&self, index: usize) -> (usize, u32) {
		let per_word = Self::values_per_word(self.bits);
		(index / per_word, (index % per_word) as u32 * self.bits)
	}

	#[inline]
	fn get_unchecked(&self, index: usize) -> u32 {
		let (word, offset) = self.locate(index);
		((self.words[word] >> offset) & mask(self.bits)) as u32
	}

	#[inline]
	fn set_unchecked(&mut self, index: usize, value: u32) {
		let (word, offset) = self.locate(index);
		let cleared = self.words[word] & !(mask(self.bits) << offset);
		self.words[word] = cleared | ((value as u64) << offset);
	}
}

impl BitArray for PaddedBitArray {
	fn bits(&self) -> u32 {
		self.bits
	}

	fn len(&self) -> usize {
		self.len
	}

	fn get(&self, index: usize) -> McResult<u32> {
		validate_index(index, self.len)?;
		Ok(self.get_unchecked(index))
	}

	fn set(&mut self, index: usize, value: u32) -> McResult<()> {
		validate_index(index, self.len)?;
		validate_value(value, self.bits)?;
		self.set_unchecked(index, value);
		Ok(())
	}

	fn replace(&mut self, index: usize, value: u32) -> McResult<u32> {
		validate_index(index, self.len)?;
		validate_value(value, self.bits)?;
		let old = self.get_unchecked(index);
		self.set_unchecked(index, value);
		Ok(old)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::{Rng, SeedableRng, rngs::StdRng};

	#[test]
	fn every_width_stores_every_slot() {
		let mut rng = StdRng::seed_from_u64(0x5EED);
		for bits in 1..=32u32 {
			let len = 300;
			let max = mask(bits);
			let values: Vec<u32> = (0..len).map(|_| (rng.gen::<u64>() & max) as u32).collect();
			let mut array = PackedBitArray::new(bits, len).unwrap();
			for (index, &value) in values.iter().enumerate() {
				array.set(index, value).unwrap();
			}
			for (index, &value) in values.iter().enumerate() {
				assert_eq!(array.get(index).unwrap(), value, "bits {bits} index {index}");
			}
			assert_eq!(array.words().len(), (len * bits as usize + 63) / 64);
		}
	}

	#[test]
	fn writes_do_not_disturb_neighbours() {
		for bits in [1, 5, 7, 13, 31, 32] {
			let len = 200;
			let max = mask(bits) as u32;
			let mut array = PackedBitArray::new(bits, len).unwrap();
			for index in 0..len {
				array.set(index, max).unwrap();
			}
			for index in (0..len).step_by(3) {
				array.set(index, 0).unwrap();
			}
			for index in 0..len {
				let expected = if index % 3 == 0 { 0 } else { max };
				assert_eq!(array.get(index).unwrap(), expected, "bits {bits} index {index}");
			}
		}
	}

	#[test]
	fn replace_returns_previous() {
		let mut array = PackedBitArray::new(12, 64).unwrap();
		array.set(21, 0xABC).unwrap();
		assert_eq!(array.replace(21, 0x123).unwrap(), 0xABC);
		assert_eq!(array.get(21).unwrap(), 0x123);
		assert_eq!(array.get(20).unwrap(), 0);
		assert_eq!(array.get(22).unwrap(), 0);
	}

	#[test]
	fn straddling_layout_matches_bit_stream() {
		// 5-bit values: slot 12 occupies stream bits 60..65.
		let mut array = PackedBitArray::new(5, 16).unwrap();
		array.set(12, 0b10111).unwrap();
		assert_eq!(array.words()[0], 0b0111 << 60);
		assert_eq!(array.words()[1], 0b1);
	}

	#[test]
	fn rejects_bad_arguments() {
		assert!(matches!(PackedBitArray::new(0, 4), Err(McError::InvalidBitWidth(0))));
		assert!(matches!(PackedBitArray::new(33, 4), Err(McError::InvalidBitWidth(33))));
		let mut array = PackedBitArray::new(4, 16).unwrap();
		assert!(matches!(array.get(16), Err(McError::IndexOutOfBounds { index: 16, len: 16 })));
		assert!(matches!(array.set(0, 16), Err(McError::ValueOutOfRange { value: 16, bits: 4 })));
		assert!(matches!(
			PackedBitArray::from_words(9, 64, vec![0u64; 8]),
			Err(McError::BufferTooSmall { required: 9, actual: 8 })
		));
	}

	#[test]
	fn borrowed_words_are_written_through() {
		let mut words = vec![0u64; 4];
		{
			let mut view = PackedBitArray::from_words(16, 16, words.as_mut_slice()).unwrap();
			view.set(5, 0xBEEF).unwrap();
			let detached = view.to_owned_array();
			view.set(5, 1).unwrap();
			assert_eq!(detached.get(5).unwrap(), 0xBEEF);
		}
		assert_eq!(words[1] >> 16, 1);
	}

	#[test]
	fn owned_clone_is_independent() {
		let mut array = PackedBitArray::from_values(3, 10, 0..8).unwrap();
		let copy = array.clone();
		array.set(2, 7).unwrap();
		assert_eq!(copy.get(2).unwrap(), 2);
		assert_eq!(copy.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5, 6, 7, 0, 0]);
	}

	#[test]
	fn padded_layout() {
		// 5 bits leaves 12 values per word and 4 unused bits.
		let mut array = PaddedBitArray::new(5, 4096).unwrap();
		assert_eq!(array.words().len(), 342);
		array.set(11, 31).unwrap();
		array.set(12, 1).unwrap();
		assert_eq!(array.words()[0], 31 << 55);
		assert_eq!(array.words()[1], 1);
		assert_eq!(array.replace(11, 3).unwrap(), 31);
		let mut rng = StdRng::seed_from_u64(7);
		for bits in 1..=32u32 {
			let values: Vec<u32> = (0..100).map(|_| (rng.gen::<u64>() & mask(bits)) as u32).collect();
			let array = PaddedBitArray::from_values(bits, 100, values.iter().copied()).unwrap();
			assert_eq!(array.iter().collect::<Vec<_>>(), values);
		}
	}
}
