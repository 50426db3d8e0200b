//! Compression of chunk payloads.
//!
//! Zlib is what the game writes, so zlib goes through pooled
//! [Compress]/[Decompress] contexts that are reset between uses. GZip
//! and uncompressed payloads are rare enough to use the flate2 stream
//! types directly.

use std::io::{ErrorKind, Read, Write};

use flate2::{
	read::{GzDecoder, ZlibDecoder},
	write::{GzEncoder, ZlibEncoder},
	Compress,
	Compression,
	Decompress,
	FlushCompress,
	FlushDecompress,
	Status,
};

use crate::{
	McError,
	McResult,
	util::pool::Pool,
	world::io::region::compressionscheme::CompressionScheme,
};

pub struct Compressor {
	level: Compression,
	deflaters: Pool<Compress>,
	inflaters: Pool<Decompress>,
}

impl Compressor {
	/// `pool_capacity` is the number of idle contexts of each kind that
	/// are kept for reuse.
	pub fn new(level: Compression, pool_capacity: usize) -> Self {
		Self {
			level,
			deflaters: Pool::new(pool_capacity, move || Compress::new(level, true)),
			inflaters: Pool::new(pool_capacity, || Decompress::new(true)),
		}
	}

	pub fn level(&self) -> Compression {
		self.level
	}

	pub fn compress(&self, scheme: CompressionScheme, data: &[u8]) -> McResult<Vec<u8>> {
		match scheme {
			CompressionScheme::ZLib => deflate(&mut self.deflaters.get(), data),
			CompressionScheme::GZip => {
				let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), self.level);
				encoder.write_all(data)?;
				Ok(encoder.finish()?)
			}
			CompressionScheme::Uncompressed => Ok(data.to_vec()),
		}
	}

	/// Fails with [McError::DecompressedTooLarge] rather than producing
	/// more than `max_size` bytes.
	pub fn decompress(&self, scheme: CompressionScheme, data: &[u8], max_size: usize) -> McResult<Vec<u8>> {
		match scheme {
			CompressionScheme::ZLib => inflate(&mut self.inflaters.get(), data, max_size),
			CompressionScheme::GZip => {
				let mut output = Vec::new();
				GzDecoder::new(data)
					.take((max_size as u64).saturating_add(1))
					.read_to_end(&mut output)
					.map_err(|err| match err.kind() {
						ErrorKind::UnexpectedEof => McError::TruncatedStream,
						_ => McError::IoError(err),
					})?;
				if output.len() > max_size {
					return Err(McError::DecompressedTooLarge(max_size));
				}
				Ok(output)
			}
			CompressionScheme::Uncompressed => {
				if data.len() > max_size {
					return Err(McError::DecompressedTooLarge(max_size));
				}
				Ok(data.to_vec())
			}
		}
	}
}

impl Default for Compressor {
	fn default() -> Self {
		let threads = std::thread::available_parallelism()
			.map(|count| count.get())
			.unwrap_or(4);
		Self::new(Compression::default(), threads)
	}
}

/// Decompresses a stream as it is read.
pub enum CompressedReader<R: Read> {
	ZLib(ZlibDecoder<R>),
	GZip(GzDecoder<R>),
	Uncompressed(R),
}

pub fn reader<R: Read>(scheme: CompressionScheme, reader: R) -> CompressedReader<R> {
	match scheme {
		CompressionScheme::ZLib => CompressedReader::ZLib(ZlibDecoder::new(reader)),
		CompressionScheme::GZip => CompressedReader::GZip(GzDecoder::new(reader)),
		CompressionScheme::Uncompressed => CompressedReader::Uncompressed(reader),
	}
}

impl<R: Read> Read for CompressedReader<R> {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		match self {
			CompressedReader::ZLib(inner) => inner.read(buf),
			CompressedReader::GZip(inner) => inner.read(buf),
			CompressedReader::Uncompressed(inner) => inner.read(buf),
		}
	}
}

/// Compresses everything written to it. Call [CompressedWriter::finish]
/// to write the end of the stream.
pub enum CompressedWriter<W: Write> {
	ZLib(ZlibEncoder<W>),
	GZip(GzEncoder<W>),
	Uncompressed(W),
}

pub fn writer<W: Write>(scheme: CompressionScheme, writer: W, level: Compression) -> CompressedWriter<W> {
	match scheme {
		CompressionScheme::ZLib => CompressedWriter::ZLib(ZlibEncoder::new(writer, level)),
		CompressionScheme::GZip => CompressedWriter::GZip(GzEncoder::new(writer, level)),
		CompressionScheme::Uncompressed => CompressedWriter::Uncompressed(writer),
	}
}

impl<W: Write> CompressedWriter<W> {
	/// Ends the stream and returns the inner writer.
	pub fn finish(self) -> McResult<W> {
		Ok(match self {
			CompressedWriter::ZLib(inner) => inner.finish()?,
			CompressedWriter::GZip(inner) => inner.finish()?,
			CompressedWriter::Uncompressed(mut inner) => {
				inner.flush()?;
				inner
			}
		})
	}
}

impl<W: Write> Write for CompressedWriter<W> {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		match self {
			CompressedWriter::ZLib(inner) => inner.write(buf),
			CompressedWriter::GZip(inner) => inner.write(buf),
			CompressedWriter::Uncompressed(inner) => inner.write(buf),
		}
	}

	fn flush(&mut self) -> std::io::Result<()> {
		match self {
			CompressedWriter::ZLib(inner) => inner.flush(),
			CompressedWriter::GZip(inner) => inner.flush(),
			CompressedWriter::Uncompressed(inner) => inner.flush(),
		}
	}
}

fn deflate(context: &mut Compress, input: &[u8]) -> McResult<Vec<u8>> {
	context.reset();
	let mut output = Vec::with_capacity(input.len() / 2 + 64);
	loop {
		if output.len() == output.capacity() {
			output.reserve(output.capacity().max(64));
		}
		let consumed = context.total_in() as usize;
		let status = context.compress_vec(&input[consumed..], &mut output, FlushCompress::Finish)?;
		if status == Status::StreamEnd {
			return Ok(output);
		}
	}
}

fn inflate(context: &mut Decompress, input: &[u8], max_size: usize) -> McResult<Vec<u8>> {
	context.reset(true);
	let mut output = Vec::with_capacity(input.len().saturating_mul(4).clamp(64, max_size.max(64)));
	loop {
		let before = (context.total_in(), context.total_out());
		let consumed = context.total_in() as usize;
		let status = context.decompress_vec(&input[consumed..], &mut output, FlushDecompress::None)?;
		if output.len() > max_size {
			return Err(McError::DecompressedTooLarge(max_size));
		}
		if status == Status::StreamEnd {
			return Ok(output);
		}
		if output.len() == output.capacity() {
			// Room for one byte past the limit is enough to notice it.
			let room = output.capacity().min(max_size.saturating_add(1) - output.len()).max(1);
			output.reserve_exact(room);
		} else if before == (context.total_in(), context.total_out()) {
			return Err(McError::TruncatedStream);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::{Rng, SeedableRng, rngs::StdRng};

	fn payload() -> Vec<u8> {
		let mut rng = StdRng::seed_from_u64(99);
		(0..50_000).map(|i| if i % 7 == 0 { rng.gen() } else { (i % 13) as u8 }).collect()
	}

	#[test]
	fn every_scheme_round_trips() {
		let compressor = Compressor::new(Compression::best(), 2);
		let data = payload();
		for scheme in [CompressionScheme::ZLib, CompressionScheme::GZip, CompressionScheme::Uncompressed] {
			let packed = compressor.compress(scheme, &data).unwrap();
			let unpacked = compressor.decompress(scheme, &packed, data.len()).unwrap();
			assert_eq!(unpacked, data);
		}
	}

	#[test]
	fn contexts_are_reused() {
		let compressor = Compressor::new(Compression::fast(), 1);
		let data = payload();
		for _ in 0..3 {
			let packed = compressor.compress(CompressionScheme::ZLib, &data).unwrap();
			assert_eq!(compressor.decompress(CompressionScheme::ZLib, &packed, usize::MAX / 2).unwrap(), data);
		}
		assert_eq!(compressor.inflaters.idle_count(), 1);
		assert_eq!(compressor.deflaters.idle_count(), 1);
	}

	#[test]
	fn limit_is_enforced() {
		let compressor = Compressor::default();
		let data = vec![0u8; 100_000];
		for scheme in [CompressionScheme::ZLib, CompressionScheme::GZip, CompressionScheme::Uncompressed] {
			let packed = compressor.compress(scheme, &data).unwrap();
			assert!(matches!(
				compressor.decompress(scheme, &packed, 99_999),
				Err(McError::DecompressedTooLarge(99_999))
			));
		}
	}

	#[test]
	fn streams_match_buffered_output() {
		let compressor = Compressor::default();
		let data = payload();
		for scheme in [CompressionScheme::ZLib, CompressionScheme::GZip, CompressionScheme::Uncompressed] {
			let mut stream = writer(scheme, Vec::new(), Compression::default());
			for chunk in data.chunks(1000) {
				stream.write_all(chunk).unwrap();
			}
			let packed = stream.finish().unwrap();
			assert_eq!(compressor.decompress(scheme, &packed, data.len()).unwrap(), data);

			let buffered = compressor.compress(scheme, &data).unwrap();
			let mut unpacked = Vec::new();
			reader(scheme, &buffered[..]).read_to_end(&mut unpacked).unwrap();
			assert_eq!(unpacked, data);
		}
	}

	#[test]
	fn truncated_stream_is_detected() {
		let compressor = Compressor::default();
		let packed = compressor.compress(CompressionScheme::ZLib, &payload()).unwrap();
		let cut = &packed[..packed.len() / 2];
		assert!(matches!(
			compressor.decompress(CompressionScheme::ZLib, cut, 1 << 20),
			Err(McError::TruncatedStream)
		));
	}
}
