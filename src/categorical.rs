//! Calendar-derived categorical coordinates
//!
//! Each [`CategoricalSpec`] maps a point on a cube's time coordinate, decomposed
//! under that coordinate's own calendar, to a label. Compound requests such as
//! `annual_seasonal_mean` expand through a fixed table into primitive specs
//! attached together.

use crate::cube::{Coord, CoordValues, Cube, Unit};
use crate::errors::{CubeHelperError, Result};
use crate::units::CalendarDateTime;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];
const WEEKDAY_ABBREVIATIONS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Meteorological season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Djf,
    Mam,
    Jja,
    Son,
}

impl Season {
    #[must_use]
    pub const fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Mam,
            6..=8 => Self::Jja,
            9..=11 => Self::Son,
            _ => Self::Djf,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Djf => "djf",
            Self::Mam => "mam",
            Self::Jja => "jja",
            Self::Son => "son",
        }
    }

    #[must_use]
    pub const fn number(self) -> i64 {
        match self {
            Self::Djf => 0,
            Self::Mam => 1,
            Self::Jja => 2,
            Self::Son => 3,
        }
    }

    /// Year the season containing `date` is attributed to: December counts
    /// towards the following year's DJF.
    #[must_use]
    pub const fn year_of(date: &CalendarDateTime) -> i64 {
        if date.month == 12 {
            date.year as i64 + 1
        } else {
            date.year as i64
        }
    }
}

/// A primitive calendar field derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoricalSpec {
    Year,
    MonthNumber,
    Month,
    MonthFullname,
    DayOfMonth,
    DayOfYear,
    /// 0 = Monday .. 6 = Sunday
    WeekdayNumber,
    Weekday,
    WeekdayFullname,
    Hour,
    Season,
    ClimSeason,
    SeasonNumber,
    /// Whether the point falls in DJF
    SeasonMembership,
    SeasonYear,
}

impl CategoricalSpec {
    pub const ALL: [Self; 15] = [
        Self::Year,
        Self::MonthNumber,
        Self::Month,
        Self::MonthFullname,
        Self::DayOfMonth,
        Self::DayOfYear,
        Self::WeekdayNumber,
        Self::Weekday,
        Self::WeekdayFullname,
        Self::Hour,
        Self::Season,
        Self::ClimSeason,
        Self::SeasonNumber,
        Self::SeasonMembership,
        Self::SeasonYear,
    ];

    /// Name of the coordinate this spec attaches
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::MonthNumber => "month_number",
            Self::Month => "month",
            Self::MonthFullname => "month_fullname",
            Self::DayOfMonth => "day_of_month",
            Self::DayOfYear => "day_of_year",
            Self::WeekdayNumber => "weekday_number",
            Self::Weekday => "weekday",
            Self::WeekdayFullname => "weekday_fullname",
            Self::Hour => "hour",
            Self::Season => "season",
            Self::ClimSeason => "clim_season",
            Self::SeasonNumber => "season_number",
            Self::SeasonMembership => "season_membership",
            Self::SeasonYear => "season_year",
        }
    }

    /// Labels for each date, in order
    #[must_use]
    pub fn derive(self, dates: &[CalendarDateTime]) -> CoordValues {
        let ints = |f: fn(&CalendarDateTime) -> i64| CoordValues::Int(dates.iter().map(f).collect());
        let text =
            |f: fn(&CalendarDateTime) -> &'static str| CoordValues::Text(dates.iter().map(|d| f(d).to_string()).collect());
        let month_index = |d: &CalendarDateTime| (d.month - 1) as usize;
        let weekday_index = |d: &CalendarDateTime| d.weekday_number() as usize;

        match self {
            Self::Year => ints(|d| i64::from(d.year)),
            Self::MonthNumber => ints(|d| i64::from(d.month)),
            Self::Month => CoordValues::Text(
                dates.iter().map(|d| MONTH_ABBREVIATIONS[month_index(d)].to_string()).collect(),
            ),
            Self::MonthFullname => CoordValues::Text(
                dates.iter().map(|d| MONTH_NAMES[month_index(d)].to_string()).collect(),
            ),
            Self::DayOfMonth => ints(|d| i64::from(d.day)),
            Self::DayOfYear => ints(|d| i64::from(d.day_of_year())),
            Self::WeekdayNumber => ints(|d| i64::from(d.weekday_number())),
            Self::Weekday => CoordValues::Text(
                dates.iter().map(|d| WEEKDAY_ABBREVIATIONS[weekday_index(d)].to_string()).collect(),
            ),
            Self::WeekdayFullname => CoordValues::Text(
                dates.iter().map(|d| WEEKDAY_NAMES[weekday_index(d)].to_string()).collect(),
            ),
            Self::Hour => ints(|d| i64::from(d.hour)),
            Self::Season | Self::ClimSeason => text(|d| Season::from_month(d.month).as_str()),
            Self::SeasonNumber => ints(|d| Season::from_month(d.month).number()),
            Self::SeasonMembership => CoordValues::Bool(
                dates
                    .iter()
                    .map(|d| Season::from_month(d.month) == Season::Djf)
                    .collect(),
            ),
            Self::SeasonYear => ints(Season::year_of),
        }
    }
}

/// Multi-coordinate requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compound {
    /// `clim_season` + `season_year`
    AnnualSeasonalMean,
}

impl Compound {
    pub const ALL: [Self; 1] = [Self::AnnualSeasonalMean];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AnnualSeasonalMean => "annual_seasonal_mean",
        }
    }

    /// Primitive specs this compound attaches, in order
    #[must_use]
    pub const fn expand(self) -> &'static [CategoricalSpec] {
        match self {
            Self::AnnualSeasonalMean => &[CategoricalSpec::ClimSeason, CategoricalSpec::SeasonYear],
        }
    }
}

/// A requested categorical, primitive or compound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Categorical {
    Primitive(CategoricalSpec),
    Compound(Compound),
}

impl Categorical {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Primitive(spec) => spec.name(),
            Self::Compound(compound) => compound.name(),
        }
    }

    #[must_use]
    pub fn expand(self) -> Vec<CategoricalSpec> {
        match self {
            Self::Primitive(spec) => vec![spec],
            Self::Compound(compound) => compound.expand().to_vec(),
        }
    }

    /// Names of the coordinates attached for this request
    #[must_use]
    pub fn coord_names(self) -> Vec<&'static str> {
        self.expand().into_iter().map(CategoricalSpec::name).collect()
    }
}

impl FromStr for Categorical {
    type Err = CubeHelperError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        CategoricalSpec::ALL
            .into_iter()
            .find(|spec| spec.name() == name)
            .map(Self::Primitive)
            .or_else(|| {
                Compound::ALL
                    .into_iter()
                    .find(|c| c.name() == name)
                    .map(Self::Compound)
            })
            .ok_or_else(|| CubeHelperError::UnknownCategorical {
                name: name.to_string(),
            })
    }
}

impl fmt::Display for Categorical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attach the coordinate(s) named by `name` along the cube's time axis.
///
/// Mutates `cube` in place and hands it back. Re-deriving an existing
/// categorical replaces it.
pub fn add_categorical<'a>(cube: &'a mut Cube, name: &str) -> Result<&'a mut Cube> {
    add_categoricals(cube, &[name])
}

/// Attach several categoricals; every name is resolved before the cube is touched
pub fn add_categoricals<'a>(cube: &'a mut Cube, names: &[&str]) -> Result<&'a mut Cube> {
    let mut specs = Vec::new();
    for name in names {
        specs.extend(name.parse::<Categorical>()?.expand());
    }
    add_categorical_specs(cube, &specs)
}

/// Attach primitive specs along the cube's time axis
pub fn add_categorical_specs<'a>(
    cube: &'a mut Cube,
    specs: &[CategoricalSpec],
) -> Result<&'a mut Cube> {
    let axis = cube.require_time_axis()?;
    let dates = time_points_as_dates(cube, axis)?;

    for spec in specs {
        let coord = Coord::new(spec.name(), Unit::NoUnit, spec.derive(&dates));
        cube.add_aux_coord(coord, axis)?;
        debug!(cube = %cube.name, categorical = spec.name(), "added categorical");
    }
    Ok(cube)
}

fn time_points_as_dates(cube: &Cube, axis: usize) -> Result<Vec<CalendarDateTime>> {
    let coord = &cube.dim_coords[axis];
    let unit = coord
        .time_unit()
        .ok_or_else(|| CubeHelperError::NoTimeCoordinate {
            cube: cube.name.clone(),
        })?;
    let points = coord
        .values
        .to_f64()
        .ok_or_else(|| CubeHelperError::InvalidUnit {
            unit: unit.to_string(),
            reason: format!("coordinate '{}' has non-numeric points", coord.name),
        })?;
    points.into_iter().map(|v| unit.num2date(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::CoordValue;
    use crate::units::TimeUnit;

    fn labels(spec: CategoricalSpec, hours: f64) -> CoordValue {
        let date = TimeUnit::epoch_hours().num2date(hours).unwrap();
        spec.derive(&[date]).get(0).unwrap()
    }

    #[test]
    fn derives_fields_for_2014_12_21() {
        let at = 394_200.0;
        assert_eq!(labels(CategoricalSpec::MonthNumber, at), CoordValue::Int(12));
        assert_eq!(labels(CategoricalSpec::Month, at), CoordValue::Text("Dec".into()));
        assert_eq!(
            labels(CategoricalSpec::MonthFullname, at),
            CoordValue::Text("December".into())
        );
        assert_eq!(
            labels(CategoricalSpec::WeekdayFullname, at),
            CoordValue::Text("Sunday".into())
        );
        assert_eq!(labels(CategoricalSpec::Weekday, at), CoordValue::Text("Sun".into()));
        assert_eq!(labels(CategoricalSpec::WeekdayNumber, at), CoordValue::Int(6));
        assert_eq!(labels(CategoricalSpec::ClimSeason, at), CoordValue::Text("djf".into()));
        assert_eq!(labels(CategoricalSpec::SeasonNumber, at), CoordValue::Int(0));
        assert_eq!(labels(CategoricalSpec::SeasonMembership, at), CoordValue::Bool(true));
        assert_eq!(labels(CategoricalSpec::SeasonYear, at), CoordValue::Int(2015));
        assert_eq!(labels(CategoricalSpec::Year, at), CoordValue::Int(2014));
        assert_eq!(labels(CategoricalSpec::DayOfYear, at), CoordValue::Int(355));
        assert_eq!(labels(CategoricalSpec::DayOfMonth, at), CoordValue::Int(21));
        assert_eq!(labels(CategoricalSpec::Hour, at + 18.0), CoordValue::Int(18));
    }

    #[test]
    fn january_keeps_its_own_season_year() {
        // 2015-01-10 00:00
        let at = 394_200.0 + 20.0 * 24.0;
        assert_eq!(labels(CategoricalSpec::SeasonYear, at), CoordValue::Int(2015));
        assert_eq!(labels(CategoricalSpec::Year, at), CoordValue::Int(2015));
    }

    #[test]
    fn resolves_names_through_the_table() {
        assert_eq!(
            "season".parse::<Categorical>().unwrap(),
            Categorical::Primitive(CategoricalSpec::Season)
        );
        let compound: Categorical = "annual_seasonal_mean".parse().unwrap();
        assert_eq!(compound.coord_names(), vec!["clim_season", "season_year"]);
        assert!(matches!(
            "fortnight".parse::<Categorical>(),
            Err(CubeHelperError::UnknownCategorical { .. })
        ));
        for spec in CategoricalSpec::ALL {
            assert_eq!(
                spec.name().parse::<Categorical>().unwrap(),
                Categorical::Primitive(spec)
            );
        }
    }
}
