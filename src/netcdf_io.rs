//! NetCDF discovery, loading and writing of cubes
//!
//! Loading follows CF conventions: the data variable's dimensions become
//! dimension coordinates (read from same-named coordinate variables when
//! present), names in its `coordinates` attribute become auxiliary
//! coordinates, and `bounds` attributes point at `[n, 2]` bounds variables.
//! Text and boolean categoricals are stored as integer flag variables with
//! `flag_values` / `flag_meanings`.

use crate::cube::{
    AttrValue, Attributes, AuxCoord, Coord, CoordValues, Cube, CubeData, DType, Unit,
};
use crate::errors::{CubeHelperError, Result};
use crate::probe::probe_error;
use crate::units::TimeUnit;
use chrono::Utc;
use ndarray::{aview1, Array2, ArrayD, IxDyn};
use netcdf::{create, open, AttributeValue, FileMut, Variable, VariableMut};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the second dimension of every bounds variable
pub const BOUNDS_DIM: &str = "bnds";

/// Attributes describing file structure rather than the data itself
const STRUCTURAL_ATTRIBUTES: [&str; 10] = [
    "units",
    "calendar",
    "bounds",
    "coordinates",
    "_FillValue",
    "missing_value",
    "flag_values",
    "flag_meanings",
    "Conventions",
    "_NCProperties",
];

/// Whether `path` carries the `filetype` extension (`".nc"` or `"nc"`)
#[must_use]
pub fn has_filetype(path: &Path, filetype: &str) -> bool {
    let wanted = filetype.trim_start_matches('.');
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case(wanted))
}

/// Files in `dir` with the `filetype` extension, sorted by name
///
/// # Errors
///
/// Returns an error if the directory cannot be read or holds no matching file.
pub fn discover_dir(dir: &Path, filetype: &str) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_filetype(path, filetype))
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(CubeHelperError::EmptyInput {
            what: format!("'{filetype}' files in {}", dir.display()),
        });
    }
    Ok(paths)
}

/// `files` with the `filetype` extension, in caller order (duplicates kept)
///
/// # Errors
///
/// Returns an error if no file matches.
pub fn filter_filelist<P: AsRef<Path>>(files: &[P], filetype: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(files.len());
    for file in files {
        let path = file.as_ref();
        if has_filetype(path, filetype) {
            paths.push(path.to_path_buf());
        } else {
            debug!(file = %path.display(), filetype, "skipping file with other extension");
        }
    }

    if paths.is_empty() {
        return Err(CubeHelperError::EmptyInput {
            what: format!("'{filetype}' files in the file list"),
        });
    }
    Ok(paths)
}

/// Load every matching file in `dir`, returning the cubes and their paths
pub fn load_from_dir(dir: &Path, filetype: &str) -> Result<(Vec<Cube>, Vec<PathBuf>)> {
    let paths = discover_dir(dir, filetype)?;
    load_paths(paths, None)
}

/// Load every matching file of `files`, returning the cubes and their paths
pub fn load_from_filelist<P: AsRef<Path>>(
    files: &[P],
    filetype: &str,
) -> Result<(Vec<Cube>, Vec<PathBuf>)> {
    let paths = filter_filelist(files, filetype)?;
    load_paths(paths, None)
}

/// Load one cube per path, in order
pub fn load_paths(paths: Vec<PathBuf>, variable: Option<&str>) -> Result<(Vec<Cube>, Vec<PathBuf>)> {
    let cubes = paths
        .iter()
        .map(|path| load_cube(path, variable))
        .collect::<Result<Vec<_>>>()?;
    info!(files = paths.len(), "loaded cubes");
    Ok((cubes, paths))
}

/// Time unit and raw points of the file's time coordinate variable
pub fn read_time_axis(path: &Path) -> Result<(TimeUnit, Vec<f64>)> {
    let file = open(path)?;
    let origin = path.display().to_string();

    let is_time = |var: &Variable| {
        var.dimensions().len() == 1
            && attr_string(var, "units").map_or(false, |u| u.contains(" since "))
    };
    let var = file
        .variables()
        .find(|var| is_time(var) && is_coordinate_variable(var))
        .or_else(|| file.variables().find(|var| is_time(var)))
        .ok_or_else(|| probe_error(&origin, "no time coordinate variable"))?;

    let unit = read_unit(&var)?;
    let unit = unit
        .as_time()
        .copied()
        .ok_or_else(|| probe_error(&origin, "time coordinate has no time-reference unit"))?;
    Ok((unit, var.get_values::<f64, _>(..)?))
}

/// Load a single cube from `path`.
///
/// `variable` names the data variable; by default the first variable that is
/// neither a coordinate nor a bounds variable is used.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the variable is missing, or
/// a coordinate carries an unparseable unit.
pub fn load_cube(path: &Path, variable: Option<&str>) -> Result<Cube> {
    let file = open(path)?;
    let not_found = |var: &str| CubeHelperError::VariableNotFound {
        var: var.to_string(),
        path: path.to_path_buf(),
    };

    let referenced: BTreeSet<String> = file
        .variables()
        .flat_map(|var| {
            let mut names: Vec<String> = attr_string(&var, "bounds").into_iter().collect();
            if let Some(coords) = attr_string(&var, "coordinates") {
                names.extend(coords.split_whitespace().map(String::from));
            }
            names
        })
        .collect();

    let var = match variable {
        Some(name) => file.variable(name).ok_or_else(|| not_found(name))?,
        None => file
            .variables()
            .find(|var| {
                !is_coordinate_variable(var)
                    && !referenced.contains(&var.name())
                    && !var.dimensions().is_empty()
                    && dtype_of(var).is_some()
            })
            .ok_or_else(|| not_found("<data variable>"))?,
    };
    let name = var.name();
    let dtype = dtype_of(&var).ok_or_else(|| CubeHelperError::InvalidUnit {
        unit: format!("{:?}", var.vartype()).to_lowercase(),
        reason: format!("variable '{name}' is not numeric"),
    })?;

    let dim_names: Vec<String> = var.dimensions().iter().map(|d| d.name().to_string()).collect();
    let shape: Vec<usize> = var
        .dimensions()
        .iter()
        .map(netcdf::Dimension::len)
        .collect();
    let data = read_data(&var, dtype, &shape)?;

    let mut dim_coords = Vec::with_capacity(dim_names.len());
    for (dim, &len) in dim_names.iter().zip(&shape) {
        let coord = match file.variable(dim) {
            Some(coord_var) => read_coord(&file, &coord_var)?,
            None => Coord::new(
                dim.clone(),
                Unit::NoUnit,
                CoordValues::Int((0..len as i64).collect()),
            ),
        };
        dim_coords.push(coord);
    }

    let units = attr_string(&var, "units").unwrap_or_else(|| "unknown".to_string());
    let mut cube = Cube::new(name.clone(), units, data, dim_coords)?;

    for aux_name in attr_string(&var, "coordinates")
        .unwrap_or_default()
        .split_whitespace()
    {
        let Some(aux_var) = file.variable(aux_name) else {
            debug!(coord = aux_name, "coordinate variable listed but absent");
            continue;
        };
        let axis = match aux_var.dimensions() {
            [dim] => dim_names.iter().position(|d| *d == dim.name()),
            _ => None,
        };
        match axis {
            Some(axis) => cube.aux_coords.push(AuxCoord {
                coord: read_coord(&file, &aux_var)?,
                axis,
            }),
            None => debug!(coord = aux_name, "skipping coordinate not bound to a single axis"),
        }
    }

    let mut attributes = Attributes::new();
    for attr in file.attributes().chain(var.attributes()) {
        let key = attr.name().to_string();
        if STRUCTURAL_ATTRIBUTES.contains(&key.as_str()) {
            continue;
        }
        if let Some(value) = convert_attribute(attr.value()?) {
            attributes.insert(key, value);
        }
    }
    cube.attributes = attributes;
    cube.fill_value = attr_f64(&var, "_FillValue").or_else(|| attr_f64(&var, "missing_value"));
    cube.sources.push(path.to_path_buf());

    debug!(file = %path.display(), cube = %cube.summary(), "loaded cube");
    Ok(cube)
}

/// Add the data variable, its attributes and values
macro_rules! write_data {
    ($file:expr, $cube:expr, $dims:expr, $array:expr, $ty:ty) => {{
        let mut var = $file.add_variable::<$ty>(&$cube.name, $dims)?;
        if let Some(fill) = $cube.fill_value {
            var.put_attribute("_FillValue", fill as $ty)?;
        }
        put_data_attributes(&mut var, $cube)?;
        var.put($array.view(), ..)?;
    }};
}

/// Writes cubes to NetCDF files
pub struct NetCDFWriter<'a> {
    output_path: &'a Path,
}

impl<'a> NetCDFWriter<'a> {
    /// Create a new NetCDF writer
    pub fn new(output_path: &'a Path) -> Self {
        Self { output_path }
    }

    /// Write `cube`, replacing any existing file at the output path
    pub fn write_cube(&self, cube: &Cube) -> Result<()> {
        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }

        let mut file = create(self.output_path)?;

        for coord in &cube.dim_coords {
            file.add_dimension(&coord.name, coord.len())?;
        }
        let has_bounds = cube
            .dim_coords
            .iter()
            .chain(cube.aux_coords.iter().map(|aux| &aux.coord))
            .any(|c| c.bounds.is_some());
        if has_bounds {
            file.add_dimension(BOUNDS_DIM, 2)?;
        }

        for coord in &cube.dim_coords {
            write_coord(&mut file, coord, &coord.name)?;
        }
        for aux in &cube.aux_coords {
            write_coord(&mut file, &aux.coord, &cube.dim_coords[aux.axis].name)?;
        }

        let dims: Vec<&str> = cube.dim_coords.iter().map(|c| c.name.as_str()).collect();
        match &cube.data {
            CubeData::Int16(a) => write_data!(file, cube, &dims, a, i16),
            CubeData::Int32(a) => write_data!(file, cube, &dims, a, i32),
            CubeData::Int64(a) => write_data!(file, cube, &dims, a, i64),
            CubeData::Float32(a) => write_data!(file, cube, &dims, a, f32),
            CubeData::Float64(a) => write_data!(file, cube, &dims, a, f64),
        }

        file.add_attribute("Conventions", "CF-1.7".to_string())?;
        file.add_attribute(
            "history",
            format!("Created by cube_helper on {}", Utc::now().to_rfc3339()),
        )?;

        info!(file = %self.output_path.display(), cube = %cube.summary(), "wrote cube");
        Ok(())
    }
}

/// Write `cube` to `path`
pub fn save_cube(cube: &Cube, path: &Path) -> Result<()> {
    NetCDFWriter::new(path).write_cube(cube)
}

fn put_data_attributes(var: &mut VariableMut, cube: &Cube) -> Result<()> {
    var.put_attribute("units", cube.units.clone())?;
    if !cube.aux_coords.is_empty() {
        let names: Vec<&str> = cube.aux_coords.iter().map(|a| a.coord.name.as_str()).collect();
        var.put_attribute("coordinates", names.join(" "))?;
    }

    for (key, value) in &cube.attributes {
        if STRUCTURAL_ATTRIBUTES.contains(&key.as_str()) {
            continue;
        }
        match value {
            AttrValue::Str(s) => var.put_attribute(key, s.clone())?,
            AttrValue::Int(i) => var.put_attribute(key, *i)?,
            AttrValue::Float(f) => var.put_attribute(key, *f)?,
            AttrValue::Ints(is) => var.put_attribute(key, is.clone())?,
            AttrValue::Floats(fs) => var.put_attribute(key, fs.clone())?,
        };
    }
    Ok(())
}

fn write_coord(file: &mut FileMut, coord: &Coord, dim: &str) -> Result<()> {
    let dims = [dim];
    let bounds_name = format!("{}_{BOUNDS_DIM}", coord.name);

    {
        let mut var = match &coord.values {
            CoordValues::Float(values) => {
                let mut var = file.add_variable::<f64>(&coord.name, &dims)?;
                var.put(aview1(values), ..)?;
                var
            }
            CoordValues::Int(values) => {
                let mut var = file.add_variable::<i64>(&coord.name, &dims)?;
                var.put(aview1(values), ..)?;
                var
            }
            CoordValues::Text(labels) => {
                let (codes, meanings) = encode_flags(labels.iter().map(|l| l.replace(' ', "_")));
                write_flags(file, &coord.name, &dims, &codes, &meanings)?
            }
            CoordValues::Bool(flags) => {
                let codes: Vec<i32> = flags.iter().map(|&b| i32::from(b)).collect();
                let meanings = vec!["false".to_string(), "true".to_string()];
                write_flags(file, &coord.name, &dims, &codes, &meanings)?
            }
        };

        match &coord.unit {
            Unit::Time(unit) => {
                var.put_attribute("units", unit.origin_string())?;
                var.put_attribute("calendar", unit.calendar().as_str().to_string())?;
            }
            Unit::Named(name) => {
                var.put_attribute("units", name.clone())?;
            }
            Unit::NoUnit => {}
        }
        if coord.bounds.is_some() {
            var.put_attribute("bounds", bounds_name.clone())?;
        }
    }

    if let Some(bounds) = &coord.bounds {
        let flat: Vec<f64> = bounds.iter().flatten().copied().collect();
        let array = Array2::from_shape_vec((bounds.len(), 2), flat)?;
        let mut var = file.add_variable::<f64>(&bounds_name, &[dim, BOUNDS_DIM])?;
        var.put(array.view(), ..)?;
    }
    Ok(())
}

fn write_flags<'f>(
    file: &'f mut FileMut,
    name: &str,
    dims: &[&str],
    codes: &[i32],
    meanings: &[String],
) -> Result<VariableMut<'f>> {
    let mut var = file.add_variable::<i32>(name, dims)?;
    let values: Vec<i32> = (0..meanings.len() as i32).collect();
    var.put_attribute("flag_values", values)?;
    var.put_attribute("flag_meanings", meanings.join(" "))?;
    var.put(aview1(codes), ..)?;
    Ok(var)
}

/// Codes per label and the distinct labels, in first-appearance order
fn encode_flags(labels: impl Iterator<Item = String>) -> (Vec<i32>, Vec<String>) {
    let mut lookup: HashMap<String, i32> = HashMap::new();
    let mut meanings = Vec::new();
    let codes = labels
        .map(|label| {
            *lookup.entry(label.clone()).or_insert_with(|| {
                meanings.push(label);
                meanings.len() as i32 - 1
            })
        })
        .collect();
    (codes, meanings)
}

fn read_data(var: &Variable, dtype: DType, shape: &[usize]) -> Result<CubeData> {
    let shape = IxDyn(shape);
    Ok(match dtype {
        DType::Int16 => CubeData::Int16(ArrayD::from_shape_vec(shape, var.get_values::<i16, _>(..)?)?),
        DType::Int32 => CubeData::Int32(ArrayD::from_shape_vec(shape, var.get_values::<i32, _>(..)?)?),
        DType::Int64 => CubeData::Int64(ArrayD::from_shape_vec(shape, var.get_values::<i64, _>(..)?)?),
        DType::Float32 => {
            CubeData::Float32(ArrayD::from_shape_vec(shape, var.get_values::<f32, _>(..)?)?)
        }
        DType::Float64 => {
            CubeData::Float64(ArrayD::from_shape_vec(shape, var.get_values::<f64, _>(..)?)?)
        }
    })
}

fn read_coord(file: &netcdf::File, var: &Variable) -> Result<Coord> {
    let unit = read_unit(var)?;
    let flags = attr_ints(var, "flag_values").zip(attr_string(var, "flag_meanings"));

    let values = match flags {
        Some((flag_values, meanings)) => {
            let meanings: Vec<&str> = meanings.split_whitespace().collect();
            let codes = var.get_values::<i64, _>(..)?;
            if meanings == ["false", "true"] {
                CoordValues::Bool(codes.iter().map(|&c| c != 0).collect())
            } else {
                CoordValues::Text(
                    codes
                        .iter()
                        .map(|c| {
                            flag_values
                                .iter()
                                .position(|v| v == c)
                                .and_then(|i| meanings.get(i))
                                .map_or_else(String::new, |m| (*m).to_string())
                        })
                        .collect(),
                )
            }
        }
        None if unit.as_time().is_some() || dtype_of(var).map_or(true, DType::is_float) => {
            CoordValues::Float(var.get_values::<f64, _>(..)?)
        }
        None => CoordValues::Int(var.get_values::<i64, _>(..)?),
    };

    let mut coord = Coord::new(var.name(), unit, values);
    if let Some(bounds_var) = attr_string(var, "bounds").and_then(|b| file.variable(&b)) {
        let flat = bounds_var.get_values::<f64, _>(..)?;
        coord.bounds = Some(flat.chunks_exact(2).map(|pair| [pair[0], pair[1]]).collect());
    }
    Ok(coord)
}

fn read_unit(var: &Variable) -> Result<Unit> {
    let units = attr_string(var, "units");
    let calendar = attr_string(var, "calendar");
    Unit::parse(units.as_deref(), calendar.as_deref())
}

/// One-dimensional variable named after its own dimension
fn is_coordinate_variable(var: &Variable) -> bool {
    match var.dimensions() {
        [dim] => dim.name() == var.name(),
        _ => false,
    }
}

fn dtype_of(var: &Variable) -> Option<DType> {
    let data_type = format!("{:?}", var.vartype()).to_lowercase();
    let has = |keys: &[&str]| keys.iter().any(|k| data_type.contains(k));

    if has(&["char", "string"]) {
        None
    } else if has(&["f64", "double"]) {
        Some(DType::Float64)
    } else if has(&["f32", "float"]) {
        Some(DType::Float32)
    } else if has(&["i64", "u64", "u32", "longlong"]) {
        Some(DType::Int64)
    } else if has(&["i16", "i8", "u8", "short", "byte"]) {
        Some(DType::Int16)
    } else if has(&["i32", "u16", "int"]) {
        Some(DType::Int32)
    } else {
        None
    }
}

fn attr_string(var: &Variable, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        AttributeValue::Strs(s) => Some(s.join(" ")),
        _ => None,
    }
}

fn attr_f64(var: &Variable, name: &str) -> Option<f64> {
    match convert_attribute(var.attribute(name)?.value().ok()?)? {
        AttrValue::Int(i) => Some(i as f64),
        AttrValue::Float(f) => Some(f),
        _ => None,
    }
}

fn attr_ints(var: &Variable, name: &str) -> Option<Vec<i64>> {
    match convert_attribute(var.attribute(name)?.value().ok()?)? {
        AttrValue::Int(i) => Some(vec![i]),
        AttrValue::Ints(is) => Some(is),
        _ => None,
    }
}

fn convert_attribute(value: AttributeValue) -> Option<AttrValue> {
    Some(match value {
        AttributeValue::Str(s) => AttrValue::Str(s),
        AttributeValue::Strs(s) => AttrValue::Str(s.join("\n")),
        AttributeValue::Schar(v) => AttrValue::Int(v.into()),
        AttributeValue::Uchar(v) => AttrValue::Int(v.into()),
        AttributeValue::Short(v) => AttrValue::Int(v.into()),
        AttributeValue::Ushort(v) => AttrValue::Int(v.into()),
        AttributeValue::Int(v) => AttrValue::Int(v.into()),
        AttributeValue::Uint(v) => AttrValue::Int(v.into()),
        AttributeValue::Longlong(v) => AttrValue::Int(v),
        AttributeValue::Float(v) => AttrValue::Float(v.into()),
        AttributeValue::Double(v) => AttrValue::Float(v),
        AttributeValue::Shorts(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Ints(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Longlongs(v) => AttrValue::Ints(v),
        AttributeValue::Floats(v) => AttrValue::Floats(v.into_iter().map(f64::from).collect()),
        AttributeValue::Doubles(v) => AttrValue::Floats(v),
        _ => return None,
    })
}
