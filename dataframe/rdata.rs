/*!
This module decodes R's binary serialization format, which is what `save()` writes into `.rda` files. Only the xdr encoding is supported, which is what R writes by default. The payload may be gzip, bzip2 or xz compressed.

An `.rda` file holds a pairlist of named objects. [`read_data_frame`] returns the first of them that is a `data.frame`, converted into a [`DataFrame`]: factors become enum columns, integer, logical and double vectors become number columns, and character vectors become text columns.
*/

use super::*;
use std::{borrow::Cow, io::Read};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RDataError {
	#[error("unexpected end of input")]
	UnexpectedEof,
	#[error("the input is not in R's serialization format")]
	BadMagic,
	#[error("the serialization format {0:?} is not supported, only xdr is")]
	UnsupportedFormat(char),
	#[error("serialization version {0} is not supported")]
	UnsupportedVersion(i32),
	#[error("objects of type {0} are not supported")]
	UnsupportedType(u8),
	#[error("the altrep class {0:?} is not supported")]
	UnsupportedAltrep(String),
	#[error("reference {0} does not exist")]
	InvalidReference(usize),
	#[error("invalid length {0}")]
	InvalidLength(i64),
	#[error("failed to decompress gzip data")]
	Gzip(#[from] std::io::Error),
	#[error("failed to decompress bzip2 data")]
	Bzip2(#[source] std::io::Error),
	#[error("failed to decompress xz data: {0}")]
	Xz(#[from] lzma_rs::error::Error),
	#[error("no data frame found")]
	NoDataFrame,
	#[error("data frame column {0:?} has an unsupported type")]
	UnsupportedColumn(String),
	#[error("data frame column {name:?} has {len} values but the first column has {expected}")]
	ColumnLength {
		name: String,
		len: usize,
		expected: usize,
	},
}

/// A decoded R object along with its attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct RObject {
	pub value: RValue,
	pub attributes: Vec<(String, RObject)>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RValue {
	Null,
	Symbol(String),
	Char(Option<String>),
	Logical(Vec<Option<bool>>),
	Integer(Vec<Option<i32>>),
	Real(Vec<f64>),
	Complex(Vec<(f64, f64)>),
	Strings(Vec<Option<String>>),
	List(Vec<RObject>),
	Pairlist(Vec<(Option<String>, RObject)>),
	Raw(Vec<u8>),
	Environment,
	/// An object that is read past but not decoded, such as a closure or a language object.
	Other(u8),
}

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const XZ_MAGIC: &[u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];
const BZIP2_MAGIC: &[u8] = b"BZh";
const RDX2_MAGIC: &[u8] = b"RDX2\n";
const RDX3_MAGIC: &[u8] = b"RDX3\n";

const NA_INTEGER: i32 = i32::MIN;

const NILSXP: u8 = 0;
const SYMSXP: u8 = 1;
const LISTSXP: u8 = 2;
const CLOSXP: u8 = 3;
const ENVSXP: u8 = 4;
const PROMSXP: u8 = 5;
const LANGSXP: u8 = 6;
const SPECIALSXP: u8 = 7;
const BUILTINSXP: u8 = 8;
const CHARSXP: u8 = 9;
const LGLSXP: u8 = 10;
const INTSXP: u8 = 13;
const REALSXP: u8 = 14;
const CPLXSXP: u8 = 15;
const STRSXP: u8 = 16;
const DOTSXP: u8 = 17;
const VECSXP: u8 = 19;
const EXPRSXP: u8 = 20;
const BCODESXP: u8 = 21;
const EXTPTRSXP: u8 = 22;
const WEAKREFSXP: u8 = 23;
const RAWSXP: u8 = 24;
const S4SXP: u8 = 25;

const ALTREP_SXP: u8 = 238;
const ATTRLISTSXP: u8 = 239;
const ATTRLANGSXP: u8 = 240;
const BASEENV_SXP: u8 = 241;
const EMPTYENV_SXP: u8 = 242;
const PERSISTSXP: u8 = 247;
const PACKAGESXP: u8 = 248;
const NAMESPACESXP: u8 = 249;
const BASENAMESPACE_SXP: u8 = 250;
const MISSINGARG_SXP: u8 = 251;
const UNBOUNDVALUE_SXP: u8 = 252;
const GLOBALENV_SXP: u8 = 253;
const NILVALUE_SXP: u8 = 254;
const REFSXP: u8 = 255;

const LATIN1_MASK: i32 = 1 << 2;

/// Undo gzip, bzip2 or xz compression if `bytes` starts with the matching magic number. Any other input is returned as is.
pub fn decompress(bytes: &[u8]) -> Result<Cow<[u8]>, RDataError> {
	if bytes.starts_with(GZIP_MAGIC) {
		let mut output = Vec::new();
		flate2::read::MultiGzDecoder::new(bytes).read_to_end(&mut output)?;
		Ok(Cow::Owned(output))
	} else if bytes.starts_with(XZ_MAGIC) {
		let mut input = bytes;
		let mut output = Vec::new();
		lzma_rs::xz_decompress(&mut input, &mut output)?;
		Ok(Cow::Owned(output))
	} else if bytes.starts_with(BZIP2_MAGIC) {
		let mut output = Vec::new();
		bzip2::read::MultiBzDecoder::new(bytes)
			.read_to_end(&mut output)
			.map_err(RDataError::Bzip2)?;
		Ok(Cow::Owned(output))
	} else {
		Ok(Cow::Borrowed(bytes))
	}
}

/// Check whether already decompressed `bytes` hold an `.rda` file.
pub fn is_rdata(bytes: &[u8]) -> bool {
	bytes.starts_with(RDX2_MAGIC) || bytes.starts_with(RDX3_MAGIC)
}

/// Decode a single serialized object. The input may be compressed and may start with an `.rda` header.
pub fn parse(bytes: &[u8]) -> Result<RObject, RDataError> {
	let bytes = decompress(bytes)?;
	let mut body: &[u8] = &bytes;
	if is_rdata(body) {
		body = &body[RDX2_MAGIC.len()..];
	}
	let mut reader = Reader {
		bytes: body,
		position: 0,
		references: Vec::new(),
	};
	reader.read_header()?;
	reader.read_item()
}

/// Decode an `.rda` file and return the named objects it holds.
pub fn read_objects(bytes: &[u8]) -> Result<Vec<(String, RObject)>, RDataError> {
	let object = parse(bytes)?;
	match object.value {
		RValue::Pairlist(entries) => Ok(entries
			.into_iter()
			.map(|(name, object)| (name.unwrap_or_default(), object))
			.collect()),
		value => Ok(vec![(
			String::new(),
			RObject {
				value,
				attributes: object.attributes,
			},
		)]),
	}
}

/// Decode an `.rda` file and convert the first data frame in it. Returns the name the data frame was saved under along with it.
pub fn read_data_frame(bytes: &[u8]) -> Result<(String, DataFrame), RDataError> {
	let (name, object) = read_objects(bytes)?
		.into_iter()
		.find(|(_, object)| object.is_data_frame())
		.ok_or(RDataError::NoDataFrame)?;
	let dataframe = object.to_dataframe()?;
	Ok((name, dataframe))
}

impl RObject {
	fn new(value: RValue) -> Self {
		Self {
			value,
			attributes: Vec::new(),
		}
	}

	pub fn attribute(&self, name: &str) -> Option<&RObject> {
		self.attributes
			.iter()
			.find(|(attribute_name, _)| attribute_name == name)
			.map(|(_, value)| value)
	}

	/// Check whether the `class` attribute contains `class`.
	pub fn inherits(&self, class: &str) -> bool {
		match self.attribute("class").map(|value| &value.value) {
			Some(RValue::Strings(classes)) => classes
				.iter()
				.any(|value| value.as_deref() == Some(class)),
			_ => false,
		}
	}

	pub fn is_data_frame(&self) -> bool {
		matches!(self.value, RValue::List(_)) && self.inherits("data.frame")
	}

	pub fn len(&self) -> usize {
		match &self.value {
			RValue::Logical(values) => values.len(),
			RValue::Integer(values) => values.len(),
			RValue::Real(values) => values.len(),
			RValue::Complex(values) => values.len(),
			RValue::Strings(values) => values.len(),
			RValue::List(values) => values.len(),
			RValue::Pairlist(values) => values.len(),
			RValue::Raw(values) => values.len(),
			_ => 0,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn to_dataframe(&self) -> Result<DataFrame, RDataError> {
		let columns = match &self.value {
			RValue::List(columns) => columns,
			_ => return Err(RDataError::NoDataFrame),
		};
		let names: Vec<String> = match self.attribute("names").map(|names| &names.value) {
			Some(RValue::Strings(names)) => names
				.iter()
				.map(|name| name.clone().unwrap_or_default())
				.collect(),
			_ => (1..=columns.len()).map(|i| format!("V{}", i)).collect(),
		};
		let expected = columns.first().map(|column| column.len()).unwrap_or(0);
		let columns = columns
			.iter()
			.zip(names.into_iter())
			.map(|(column, name)| {
				if column.len() != expected {
					return Err(RDataError::ColumnLength {
						name,
						len: column.len(),
						expected,
					});
				}
				column.to_column(name)
			})
			.collect::<Result<Vec<_>, _>>()?;
		Ok(DataFrame { columns })
	}

	fn to_column(&self, name: String) -> Result<Column, RDataError> {
		let column = match &self.value {
			RValue::Integer(values) if self.inherits("factor") => {
				let options: Vec<String> = match self.attribute("levels").map(|levels| &levels.value)
				{
					Some(RValue::Strings(levels)) => levels
						.iter()
						.map(|level| level.clone().unwrap_or_default())
						.collect(),
					_ => Vec::new(),
				};
				// Factor codes are already 1-based indexes into the levels.
				let data = values
					.iter()
					.map(|value| {
						value
							.and_then(|value| usize::try_from(value).ok())
							.filter(|value| *value <= options.len())
							.and_then(NonZeroUsize::new)
					})
					.collect();
				Column::Enum(EnumColumn {
					name,
					options,
					data,
				})
			}
			RValue::Integer(values) => Column::Number(NumberColumn {
				name,
				data: values
					.iter()
					.map(|value| value.map(f64::from).unwrap_or(f64::NAN))
					.collect(),
			}),
			RValue::Logical(values) => Column::Number(NumberColumn {
				name,
				data: values
					.iter()
					.map(|value| match value {
						Some(true) => 1.0,
						Some(false) => 0.0,
						None => f64::NAN,
					})
					.collect(),
			}),
			RValue::Real(values) => Column::Number(NumberColumn {
				name,
				data: values.clone(),
			}),
			RValue::Strings(values) => Column::Text(TextColumn {
				name,
				data: values
					.iter()
					.map(|value| value.clone().unwrap_or_default())
					.collect(),
			}),
			_ => return Err(RDataError::UnsupportedColumn(name)),
		};
		Ok(column)
	}
}

#[derive(Clone, Copy, Debug)]
struct Flags {
	raw: i32,
	sexp_type: u8,
	levels: i32,
	has_attributes: bool,
	has_tag: bool,
}

impl Flags {
	fn new(raw: i32) -> Self {
		Self {
			raw,
			sexp_type: (raw & 0xff) as u8,
			levels: raw >> 12,
			has_attributes: raw & (1 << 9) != 0,
			has_tag: raw & (1 << 10) != 0,
		}
	}
}

struct Reader<'a> {
	bytes: &'a [u8],
	position: usize,
	references: Vec<RObject>,
}

impl<'a> Reader<'a> {
	fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], RDataError> {
		let end = self
			.position
			.checked_add(len)
			.ok_or(RDataError::UnexpectedEof)?;
		let bytes = self
			.bytes
			.get(self.position..end)
			.ok_or(RDataError::UnexpectedEof)?;
		self.position = end;
		Ok(bytes)
	}

	fn read_int(&mut self) -> Result<i32, RDataError> {
		let b = self.read_bytes(4)?;
		Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
	}

	fn read_double(&mut self) -> Result<f64, RDataError> {
		let b = self.read_bytes(8)?;
		Ok(f64::from_be_bytes([
			b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
		]))
	}

	/// Vector lengths above `i32::MAX` are written as -1 followed by two words.
	fn read_length(&mut self, item_size: usize) -> Result<usize, RDataError> {
		let len = self.read_int()?;
		let len = match len {
			-1 => {
				let upper = self.read_int()? as u32 as u64;
				let lower = self.read_int()? as u32 as u64;
				(upper << 32) | lower
			}
			len if len >= 0 => len as u64,
			len => return Err(RDataError::InvalidLength(len.into())),
		};
		let len = usize::try_from(len).map_err(|_| RDataError::InvalidLength(len as i64))?;
		// Refuse lengths the remaining input cannot hold before allocating for them.
		let remaining = self.bytes.len() - self.position;
		if len.saturating_mul(item_size) > remaining {
			return Err(RDataError::UnexpectedEof);
		}
		Ok(len)
	}

	fn read_header(&mut self) -> Result<(), RDataError> {
		match self.read_bytes(2)? {
			b"X\n" => {}
			[format @ (b'A' | b'B'), b'\n'] => {
				return Err(RDataError::UnsupportedFormat(*format as char))
			}
			_ => return Err(RDataError::BadMagic),
		}
		let version = self.read_int()?;
		let _writer_version = self.read_int()?;
		let _min_reader_version = self.read_int()?;
		match version {
			2 => {}
			3 => {
				let len = self.read_length(1)?;
				let _native_encoding = self.read_bytes(len)?;
			}
			version => return Err(RDataError::UnsupportedVersion(version)),
		}
		Ok(())
	}

	fn read_item(&mut self) -> Result<RObject, RDataError> {
		let flags = Flags::new(self.read_int()?);
		self.read_item_with_flags(flags)
	}

	fn read_item_with_flags(&mut self, flags: Flags) -> Result<RObject, RDataError> {
		match flags.sexp_type {
			NILVALUE_SXP | UNBOUNDVALUE_SXP | MISSINGARG_SXP => Ok(RObject::new(RValue::Null)),
			EMPTYENV_SXP | BASEENV_SXP | GLOBALENV_SXP | BASENAMESPACE_SXP => {
				Ok(RObject::new(RValue::Environment))
			}
			REFSXP => {
				let index = (flags.raw as u32 >> 8) as usize;
				let index = if index == 0 {
					self.read_int()? as usize
				} else {
					index
				};
				index
					.checked_sub(1)
					.and_then(|index| self.references.get(index))
					.cloned()
					.ok_or(RDataError::InvalidReference(index))
			}
			PERSISTSXP => {
				let names = self.read_string_vec()?;
				let object = RObject::new(RValue::Strings(names));
				self.references.push(object.clone());
				Ok(object)
			}
			SYMSXP => {
				let name = match self.read_item()?.value {
					RValue::Char(name) => name.unwrap_or_default(),
					_ => String::new(),
				};
				let object = RObject::new(RValue::Symbol(name));
				self.references.push(object.clone());
				Ok(object)
			}
			PACKAGESXP | NAMESPACESXP => {
				self.read_string_vec()?;
				let object = RObject::new(RValue::Environment);
				self.references.push(object.clone());
				Ok(object)
			}
			ENVSXP => {
				let _locked = self.read_int()?;
				// The environment is registered before its contents, which may refer back to it.
				self.references.push(RObject::new(RValue::Environment));
				let _enclosure = self.read_item()?;
				let _frame = self.read_item()?;
				let _hash_table = self.read_item()?;
				let _attributes = self.read_item()?;
				Ok(RObject::new(RValue::Environment))
			}
			LISTSXP | LANGSXP | CLOSXP | PROMSXP | DOTSXP => self.read_pairlist(flags),
			ALTREP_SXP => self.read_altrep(),
			ATTRLANGSXP | ATTRLISTSXP | BCODESXP => {
				Err(RDataError::UnsupportedType(flags.sexp_type))
			}
			_ => self.read_vector(flags),
		}
	}

	fn read_vector(&mut self, flags: Flags) -> Result<RObject, RDataError> {
		let value = match flags.sexp_type {
			NILSXP => RValue::Null,
			CHARSXP => {
				let len = self.read_int()?;
				match len {
					-1 => RValue::Char(None),
					len if len >= 0 => {
						let bytes = self.read_bytes(len as usize)?;
						RValue::Char(Some(decode_string(bytes, flags.levels)))
					}
					len => return Err(RDataError::InvalidLength(len.into())),
				}
			}
			LGLSXP => {
				let len = self.read_length(4)?;
				let values = (0..len)
					.map(|_| {
						self.read_int().map(|value| match value {
							NA_INTEGER => None,
							value => Some(value != 0),
						})
					})
					.collect::<Result<_, _>>()?;
				RValue::Logical(values)
			}
			INTSXP => {
				let len = self.read_length(4)?;
				let values = (0..len)
					.map(|_| self.read_int().map(|value| Some(value).filter(|v| *v != NA_INTEGER)))
					.collect::<Result<_, _>>()?;
				RValue::Integer(values)
			}
			REALSXP => {
				let len = self.read_length(8)?;
				let values = (0..len)
					.map(|_| self.read_double())
					.collect::<Result<_, _>>()?;
				RValue::Real(values)
			}
			CPLXSXP => {
				let len = self.read_length(16)?;
				let values = (0..len)
					.map(|_| Ok((self.read_double()?, self.read_double()?)))
					.collect::<Result<_, RDataError>>()?;
				RValue::Complex(values)
			}
			STRSXP => {
				let len = self.read_length(4)?;
				let values = (0..len)
					.map(|_| self.read_string())
					.collect::<Result<_, _>>()?;
				RValue::Strings(values)
			}
			VECSXP | EXPRSXP => {
				let len = self.read_length(4)?;
				let values = (0..len)
					.map(|_| self.read_item())
					.collect::<Result<_, _>>()?;
				RValue::List(values)
			}
			RAWSXP => {
				let len = self.read_length(1)?;
				RValue::Raw(self.read_bytes(len)?.to_owned())
			}
			SPECIALSXP | BUILTINSXP => {
				let len = self.read_length(1)?;
				self.read_bytes(len)?;
				RValue::Other(flags.sexp_type)
			}
			EXTPTRSXP => {
				self.references
					.push(RObject::new(RValue::Other(flags.sexp_type)));
				let _protected = self.read_item()?;
				let _tag = self.read_item()?;
				RValue::Other(flags.sexp_type)
			}
			WEAKREFSXP => {
				self.references
					.push(RObject::new(RValue::Other(flags.sexp_type)));
				RValue::Other(flags.sexp_type)
			}
			S4SXP => RValue::Other(flags.sexp_type),
			sexp_type => return Err(RDataError::UnsupportedType(sexp_type)),
		};
		let attributes = if flags.has_attributes && flags.sexp_type != CHARSXP {
			self.read_attributes()?
		} else {
			Vec::new()
		};
		Ok(RObject { value, attributes })
	}

	fn read_string(&mut self) -> Result<Option<String>, RDataError> {
		match self.read_item()?.value {
			RValue::Char(value) => Ok(value),
			_ => Err(RDataError::UnsupportedType(STRSXP)),
		}
	}

	fn read_string_vec(&mut self) -> Result<Vec<Option<String>>, RDataError> {
		let _zero = self.read_int()?;
		let len = self.read_length(4)?;
		(0..len).map(|_| self.read_string()).collect()
	}

	fn read_attributes(&mut self) -> Result<Vec<(String, RObject)>, RDataError> {
		match self.read_item()?.value {
			RValue::Pairlist(entries) => Ok(entries
				.into_iter()
				.map(|(name, value)| (name.unwrap_or_default(), value))
				.collect()),
			_ => Ok(Vec::new()),
		}
	}

	/// Pairlists are read iteratively along their cdr so long lists do not recurse.
	fn read_pairlist(&mut self, mut flags: Flags) -> Result<RObject, RDataError> {
		let head_type = flags.sexp_type;
		let mut attributes = Vec::new();
		let mut entries = Vec::new();
		loop {
			if flags.has_attributes {
				let cell_attributes = self.read_attributes()?;
				if entries.is_empty() {
					attributes = cell_attributes;
				}
			}
			let tag = if flags.has_tag {
				match self.read_item()?.value {
					RValue::Symbol(name) | RValue::Char(Some(name)) => Some(name),
					_ => None,
				}
			} else {
				None
			};
			let value = self.read_item()?;
			entries.push((tag, value));
			let next = Flags::new(self.read_int()?);
			if next.sexp_type == LISTSXP {
				flags = next;
				continue;
			}
			let tail = self.read_item_with_flags(next)?;
			if tail.value != RValue::Null {
				entries.push((None, tail));
			}
			break;
		}
		let value = if head_type == LISTSXP {
			RValue::Pairlist(entries)
		} else {
			RValue::Other(head_type)
		};
		Ok(RObject { value, attributes })
	}

	fn read_altrep(&mut self) -> Result<RObject, RDataError> {
		let info = self.read_item()?;
		let state = self.read_item()?;
		let attributes = self.read_attributes()?;
		let class = match &info.value {
			RValue::Pairlist(entries) => match entries.first().map(|(_, value)| &value.value) {
				Some(RValue::Symbol(class)) => class.clone(),
				_ => String::new(),
			},
			_ => String::new(),
		};
		let value = match class.as_str() {
			"compact_intseq" => {
				let (len, start, step) = compact_sequence_info(&state)?;
				RValue::Integer(
					(0..len as i64)
						.map(|i| i32::try_from(start as i64 + i * step as i64).ok())
						.collect(),
				)
			}
			"compact_realseq" => {
				let (len, start, step) = compact_sequence_info(&state)?;
				RValue::Real((0..len as i64).map(|i| start + i as f64 * step).collect())
			}
			"deferred_string" => match first_entry(state)?.value {
				RValue::Integer(values) => RValue::Strings(
					values
						.into_iter()
						.map(|value| value.map(|value| value.to_string()))
						.collect(),
				),
				RValue::Real(values) => RValue::Strings(
					values
						.into_iter()
						.map(|value| Some(value).filter(|v| !v.is_nan()).map(|v| v.to_string()))
						.collect(),
				),
				RValue::Strings(values) => RValue::Strings(values),
				_ => return Err(RDataError::UnsupportedAltrep(class)),
			},
			"wrap_integer" | "wrap_logical" | "wrap_real" | "wrap_complex" | "wrap_raw"
			| "wrap_string" | "wrap_list" => first_entry(state)?.value,
			_ => return Err(RDataError::UnsupportedAltrep(class)),
		};
		Ok(RObject { value, attributes })
	}
}

/// The state of a compact sequence is its length, first value and step.
fn compact_sequence_info(state: &RObject) -> Result<(f64, f64, f64), RDataError> {
	let info: Vec<f64> = match &state.value {
		RValue::Real(values) => values.clone(),
		RValue::Integer(values) => values
			.iter()
			.map(|value| value.map(f64::from).unwrap_or(f64::NAN))
			.collect(),
		_ => Vec::new(),
	};
	match info.as_slice() {
		[len, start, step] if len.is_finite() && *len >= 0.0 => Ok((*len, *start, *step)),
		_ => Err(RDataError::UnsupportedAltrep("compact sequence".to_owned())),
	}
}

fn first_entry(state: RObject) -> Result<RObject, RDataError> {
	match state.value {
		RValue::Pairlist(entries) => entries
			.into_iter()
			.next()
			.map(|(_, value)| value)
			.ok_or(RDataError::UnexpectedEof),
		_ => Err(RDataError::UnsupportedAltrep("wrapper".to_owned())),
	}
}

fn decode_string(bytes: &[u8], levels: i32) -> String {
	if levels & LATIN1_MASK != 0 {
		bytes.iter().map(|byte| *byte as char).collect()
	} else {
		String::from_utf8_lossy(bytes).into_owned()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const OBJECT: i32 = 1 << 8;
	const ATTRIBUTES: i32 = 1 << 9;
	const TAG: i32 = 1 << 10;

	#[derive(Default)]
	struct Writer(Vec<u8>);

	impl Writer {
		fn int(&mut self, value: i32) -> &mut Self {
			self.0.extend_from_slice(&value.to_be_bytes());
			self
		}

		fn real(&mut self, value: f64) -> &mut Self {
			self.0.extend_from_slice(&value.to_be_bytes());
			self
		}

		fn string(&mut self, value: Option<&str>) -> &mut Self {
			match value {
				Some(value) => {
					self.int(CHARSXP as i32 | (1 << 3) << 12);
					self.int(value.len() as i32);
					self.0.extend_from_slice(value.as_bytes());
				}
				None => {
					self.int(CHARSXP as i32);
					self.int(-1);
				}
			}
			self
		}

		fn symbol(&mut self, name: &str) -> &mut Self {
			self.int(SYMSXP as i32).string(Some(name))
		}

		fn strings(&mut self, values: &[Option<&str>]) -> &mut Self {
			self.int(STRSXP as i32).int(values.len() as i32);
			for value in values {
				self.string(*value);
			}
			self
		}

		fn ints(&mut self, flags: i32, values: &[i32]) -> &mut Self {
			self.int(INTSXP as i32 | flags).int(values.len() as i32);
			for value in values {
				self.int(*value);
			}
			self
		}

		fn nil(&mut self) -> &mut Self {
			self.int(NILVALUE_SXP as i32)
		}
	}

	/// Serialize `policies <- data.frame(...)` the way `save()` does, with a reference to the `class` symbol the second time it is used.
	fn policies_rda() -> Vec<u8> {
		let mut w = Writer::default();
		w.0.extend_from_slice(b"RDX2\nX\n");
		w.int(2).int(0x0003_0602).int(0x0002_0300);
		// The pairlist of saved objects. Symbol references are numbered in the order the symbols are first read.
		w.int(LISTSXP as i32 | TAG).symbol("policies");
		w.int(VECSXP as i32 | OBJECT | ATTRIBUTES).int(5);
		w.ints(0, &[0, 2, NA_INTEGER]);
		w.int(REALSXP as i32).int(3).real(365.0).real(0.5).real(f64::NAN);
		w.ints(OBJECT | ATTRIBUTES, &[1, 2, NA_INTEGER]);
		w.int(LISTSXP as i32 | TAG).symbol("levels");
		w.strings(&[Some("Female"), Some("Male")]);
		w.int(LISTSXP as i32 | TAG).symbol("class");
		w.strings(&[Some("factor")]);
		w.nil();
		w.int(LGLSXP as i32).int(3).int(1).int(0).int(NA_INTEGER);
		w.strings(&[Some("Retired"), None, Some("Employed")]);
		w.int(LISTSXP as i32 | TAG).symbol("names");
		w.strings(&[
			Some("Numtppd"),
			Some("Exppdays"),
			Some("Gender"),
			Some("Paid"),
			Some("Occupation"),
		]);
		w.int(LISTSXP as i32 | TAG).int(REFSXP as i32 | (3 << 8));
		w.strings(&[Some("data.frame")]);
		w.int(LISTSXP as i32 | TAG).symbol("row.names");
		w.ints(0, &[NA_INTEGER, -3]);
		w.nil();
		w.nil();
		w.0
	}

	#[test]
	fn test_read_data_frame() {
		let (name, dataframe) = read_data_frame(&policies_rda()).unwrap();
		assert_eq!(name, "policies");
		insta::assert_debug_snapshot!(dataframe, @r###"
  DataFrame {
      columns: [
          Number(
              NumberColumn {
                  name: "Numtppd",
                  data: [
                      0.0,
                      2.0,
                      NaN,
                  ],
              },
          ),
          Number(
              NumberColumn {
                  name: "Exppdays",
                  data: [
                      365.0,
                      0.5,
                      NaN,
                  ],
              },
          ),
          Enum(
              EnumColumn {
                  name: "Gender",
                  options: [
                      "Female",
                      "Male",
                  ],
                  data: [
                      Some(
                          1,
                      ),
                      Some(
                          2,
                      ),
                      None,
                  ],
              },
          ),
          Number(
              NumberColumn {
                  name: "Paid",
                  data: [
                      1.0,
                      0.0,
                      NaN,
                  ],
              },
          ),
          Text(
              TextColumn {
                  name: "Occupation",
                  data: [
                      "Retired",
                      "",
                      "Employed",
                  ],
              },
          ),
      ],
  }
  "###);
	}

	#[test]
	fn test_read_gzip_compressed() {
		let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
		encoder.write_all(&policies_rda()).unwrap();
		let compressed = encoder.finish().unwrap();
		assert!(!is_rdata(&compressed));
		assert!(is_rdata(&decompress(&compressed).unwrap()));
		let (_, dataframe) = read_data_frame(&compressed).unwrap();
		assert_eq!(dataframe.nrows(), 3);
		assert_eq!(dataframe.ncols(), 5);
	}

	#[test]
	fn test_read_bzip2_compressed() {
		let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::best());
		encoder.write_all(&policies_rda()).unwrap();
		let compressed = encoder.finish().unwrap();
		assert!(compressed.starts_with(BZIP2_MAGIC));
		assert!(is_rdata(&decompress(&compressed).unwrap()));
		let (_, dataframe) = read_data_frame(&compressed).unwrap();
		assert_eq!(dataframe.nrows(), 3);
		assert_eq!(dataframe.ncols(), 5);
	}

	#[test]
	fn test_compact_intseq() {
		let mut w = Writer::default();
		w.0.extend_from_slice(b"X\n");
		w.int(3).int(0x0004_0000).int(0x0003_0500);
		w.int(5);
		w.0.extend_from_slice(b"UTF-8");
		w.int(ALTREP_SXP as i32);
		w.int(LISTSXP as i32).symbol("compact_intseq");
		w.int(LISTSXP as i32).symbol("base");
		w.int(LISTSXP as i32).ints(0, &[INTSXP as i32]);
		w.nil();
		w.int(REALSXP as i32).int(3).real(4.0).real(1.0).real(1.0);
		w.nil();
		let object = parse(&w.0).unwrap();
		assert_eq!(
			object.value,
			RValue::Integer(vec![Some(1), Some(2), Some(3), Some(4)])
		);
	}

	#[test]
	fn test_truncated_input() {
		let bytes = policies_rda();
		let result = read_data_frame(&bytes[..bytes.len() / 2]);
		assert!(matches!(result, Err(RDataError::UnexpectedEof)));
	}

	#[test]
	fn test_not_rdata() {
		assert!(!is_rdata(b"Numtppd,Gender\n0,Male\n"));
		assert!(matches!(
			parse(b"Numtppd,Gender\n0,Male\n"),
			Err(RDataError::BadMagic)
		));
	}
}
