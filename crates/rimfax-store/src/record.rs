//! The persisted record container.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use ndarray::{Array1, Array2, Array3};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{StoreError, StoreResult};

/// A scalar experiment parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<usize> for AttrValue {
    fn from(v: usize) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        AttrValue::Int(i64::from(v))
    }
}

impl From<u8> for AttrValue {
    fn from(v: u8) -> Self {
        AttrValue::Int(i64::from(v))
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

/// A named result array. Complex buffers keep their dimensionality:
/// two-tone responses are 2-D (amplitude, frequency), pulsed store
/// buffers are 3-D (sweep point, repetition, time sample).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "array")]
pub enum ArrayData {
    #[serde(rename = "f64")]
    Float1(Array1<f64>),
    #[serde(rename = "c64_2d")]
    Complex2(Array2<Complex64>),
    #[serde(rename = "c64_3d")]
    Complex3(Array3<Complex64>),
}

/// One measurement run: source snapshot, scalar parameters, result arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Name of the generating experiment.
    pub experiment: String,
    /// Wall-clock time the record was created.
    pub timestamp: DateTime<Local>,
    /// Verbatim source text of the generating program.
    pub source_code: String,
    /// Scalar attributes, one per experiment parameter.
    pub attrs: BTreeMap<String, AttrValue>,
    /// Named result arrays.
    pub arrays: BTreeMap<String, ArrayData>,
}

impl Record {
    /// Start an empty record for `experiment`, snapshotting its source.
    pub fn new(experiment: impl Into<String>, source_code: impl Into<String>) -> Self {
        Self {
            experiment: experiment.into(),
            timestamp: Local::now(),
            source_code: source_code.into(),
            attrs: BTreeMap::new(),
            arrays: BTreeMap::new(),
        }
    }

    /// Set a scalar attribute.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Insert a named array.
    pub fn insert_array(&mut self, name: impl Into<String>, array: ArrayData) {
        self.arrays.insert(name.into(), array);
    }

    fn attr(&self, name: &str) -> StoreResult<&AttrValue> {
        self.attrs
            .get(name)
            .ok_or_else(|| StoreError::MissingAttr(name.to_owned()))
    }

    /// A float attribute; integer-valued attributes are widened.
    pub fn attr_f64(&self, name: &str) -> StoreResult<f64> {
        match self.attr(name)? {
            AttrValue::Float(v) => Ok(*v),
            AttrValue::Int(v) => Ok(*v as f64),
            _ => Err(StoreError::WrongAttrType {
                name: name.to_owned(),
                expected: "float",
            }),
        }
    }

    /// An integer attribute.
    pub fn attr_i64(&self, name: &str) -> StoreResult<i64> {
        match self.attr(name)? {
            AttrValue::Int(v) => Ok(*v),
            _ => Err(StoreError::WrongAttrType {
                name: name.to_owned(),
                expected: "integer",
            }),
        }
    }

    /// An integer attribute as a count.
    pub fn attr_usize(&self, name: &str) -> StoreResult<usize> {
        let v = self.attr_i64(name)?;
        usize::try_from(v).map_err(|_| StoreError::WrongAttrType {
            name: name.to_owned(),
            expected: "non-negative integer",
        })
    }

    /// A boolean attribute.
    pub fn attr_bool(&self, name: &str) -> StoreResult<bool> {
        match self.attr(name)? {
            AttrValue::Bool(v) => Ok(*v),
            _ => Err(StoreError::WrongAttrType {
                name: name.to_owned(),
                expected: "bool",
            }),
        }
    }

    fn array(&self, name: &str) -> StoreResult<&ArrayData> {
        self.arrays
            .get(name)
            .ok_or_else(|| StoreError::MissingArray(name.to_owned()))
    }

    /// A 1-D float array.
    pub fn array_f64(&self, name: &str) -> StoreResult<&Array1<f64>> {
        match self.array(name)? {
            ArrayData::Float1(arr) => Ok(arr),
            _ => Err(StoreError::WrongArrayType {
                name: name.to_owned(),
                expected: "a 1-D float array",
            }),
        }
    }

    /// A 2-D complex array.
    pub fn array_c64_2d(&self, name: &str) -> StoreResult<&Array2<Complex64>> {
        match self.array(name)? {
            ArrayData::Complex2(arr) => Ok(arr),
            _ => Err(StoreError::WrongArrayType {
                name: name.to_owned(),
                expected: "a 2-D complex array",
            }),
        }
    }

    /// A 3-D complex array.
    pub fn array_c64_3d(&self, name: &str) -> StoreResult<&Array3<Complex64>> {
        match self.array(name)? {
            ArrayData::Complex3(arr) => Ok(arr),
            _ => Err(StoreError::WrongArrayType {
                name: name.to_owned(),
                expected: "a 3-D complex array",
            }),
        }
    }

    /// Write the record to `path`.
    pub fn save_to(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        info!("record saved to {}", path.display());
        Ok(())
    }

    /// Write the record under `dir` with a timestamped file name,
    /// `<experiment>_<YYYYmmdd_HHMMSS>.json`, and return the full path.
    pub fn save(&self, dir: &Path) -> StoreResult<PathBuf> {
        let stamp = self.timestamp.format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("{}_{}.json", self.experiment, stamp));
        self.save_to(&path)?;
        Ok(path)
    }

    /// Load a record from `path`.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample_record() -> Record {
        let mut rec = Record::new("ramsey_echo", "const WAIT: f64 = 200e-6;\n");
        rec.set_attr("num_averages", 10_000_usize);
        rec.set_attr("control_freq", 4.093_372e9);
        rec.set_attr("wait_delay", 200e-6);
        rec.set_attr("use_jpa", true);
        rec.insert_array("t_arr", ArrayData::Float1(array![0.0, 1e-9, 2e-9]));
        rec.insert_array(
            "store_arr",
            ArrayData::Complex3(Array3::from_elem((2, 1, 3), Complex64::new(0.5, -0.25))),
        );
        rec
    }

    #[test]
    fn test_attr_accessors() {
        let rec = sample_record();
        assert_eq!(rec.attr_usize("num_averages").unwrap(), 10_000);
        assert_eq!(rec.attr_f64("wait_delay").unwrap(), 200e-6);
        // integer widening
        assert_eq!(rec.attr_f64("num_averages").unwrap(), 10_000.0);
        assert!(rec.attr_bool("use_jpa").unwrap());
        assert!(matches!(
            rec.attr_f64("missing"),
            Err(StoreError::MissingAttr(_))
        ));
        assert!(matches!(
            rec.attr_bool("control_freq"),
            Err(StoreError::WrongAttrType { .. })
        ));
    }

    #[test]
    fn test_array_accessors() {
        let rec = sample_record();
        assert_eq!(rec.array_f64("t_arr").unwrap().len(), 3);
        assert_eq!(rec.array_c64_3d("store_arr").unwrap().dim(), (2, 1, 3));
        assert!(matches!(
            rec.array_c64_2d("store_arr"),
            Err(StoreError::WrongArrayType { .. })
        ));
    }

    #[test]
    fn test_file_roundtrip() {
        let rec = sample_record();
        let dir = tempfile::tempdir().unwrap();
        let path = rec.save(dir.path()).unwrap();
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("ramsey_echo_")
        );
        let back = Record::load(&path).unwrap();
        assert_eq!(rec, back);
    }
}
