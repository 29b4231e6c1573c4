//! Per-region measurements of a labeled mask.
//!
//! Property kinds form a closed set. Names are parsed once into
//! [`RegionProperty`] and every kind maps to an accessor on [`RegionProps`].
//! Moment-based properties follow the usual image-moment definitions
//! (rows as the first axis, columns as the second).

use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
    error::{PhenotypeError, Result},
    types::LabeledMask,
};

/// Supported region properties
#[derive(
    Debug, Clone, Copy, Hash,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RegionProperty {
    Label,
    Area,
    #[strum(to_string = "bbox_area", serialize = "area_bbox")]
    BboxArea,
    Centroid,
    Bbox,
    Coords,
    Eccentricity,
    #[strum(to_string = "equivalent_diameter", serialize = "equivalent_diameter_area")]
    EquivalentDiameter,
    Extent,
    #[strum(to_string = "major_axis_length", serialize = "axis_major_length")]
    MajorAxisLength,
    #[strum(to_string = "minor_axis_length", serialize = "axis_minor_length")]
    MinorAxisLength,
    Orientation,
}

impl RegionProperty {
    /// Parse a property name, rejecting names outside the supported set
    pub fn parse(name: &str) -> Result<Self> {
        name.parse().map_err(|_| {
            PhenotypeError::Configuration(format!(
                "unknown region property '{}', expected one of {:?}",
                name,
                Self::VARIANTS
            ))
        })
    }

    /// Whether the property resolves to a single integer or float
    pub fn is_scalar(self) -> bool {
        !matches!(self, Self::Centroid | Self::Bbox | Self::Coords)
    }
}

/// Value of one property for one region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    /// `[row, col]`
    Point([f64; 2]),
    /// `[min_row, min_col, max_row, max_col]`, max exclusive
    BoundingBox([u32; 4]),
    /// `[row, col]` of every pixel
    Coordinates(Vec<[u32; 2]>),
}

impl PropertyValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Point(_) => "point",
            Self::BoundingBox(_) => "bounding box",
            Self::Coordinates(_) => "coordinate list",
        }
    }
}

/// Measurements of a single labeled region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionProps {
    pub label: u32,
    pub area: u64,
    /// `[min_row, min_col, max_row, max_col]`, max exclusive
    pub bbox: [u32; 4],
    /// `[row, col]`
    pub centroid: [f64; 2],
    pub coords: Vec<[u32; 2]>,
    /// Second central moments normalized by area: `[row, col, row-col]`
    moments: [f64; 3],
}

impl RegionProps {
    pub fn get(&self, property: RegionProperty) -> PropertyValue {
        match property {
            RegionProperty::Label => PropertyValue::Int(self.label as i64),
            RegionProperty::Area => PropertyValue::Int(self.area as i64),
            RegionProperty::BboxArea => PropertyValue::Int(self.bbox_area() as i64),
            RegionProperty::Centroid => PropertyValue::Point(self.centroid),
            RegionProperty::Bbox => PropertyValue::BoundingBox(self.bbox),
            RegionProperty::Coords => PropertyValue::Coordinates(self.coords.clone()),
            RegionProperty::Eccentricity => PropertyValue::Float(self.eccentricity()),
            RegionProperty::EquivalentDiameter => PropertyValue::Float(self.equivalent_diameter()),
            RegionProperty::Extent => PropertyValue::Float(self.extent()),
            RegionProperty::MajorAxisLength => PropertyValue::Float(self.major_axis_length()),
            RegionProperty::MinorAxisLength => PropertyValue::Float(self.minor_axis_length()),
            RegionProperty::Orientation => PropertyValue::Float(self.orientation()),
        }
    }

    pub fn bbox_area(&self) -> u64 {
        let [min_row, min_col, max_row, max_col] = self.bbox;
        (max_row - min_row) as u64 * (max_col - min_col) as u64
    }

    pub fn extent(&self) -> f64 {
        self.area as f64 / self.bbox_area() as f64
    }

    pub fn equivalent_diameter(&self) -> f64 {
        (4.0 * self.area as f64 / PI).sqrt()
    }

    /// Inertia tensor `[a, b, c]` of `[[a, b], [b, c]]`
    fn inertia_tensor(&self) -> [f64; 3] {
        let [mu_rr, mu_cc, mu_rc] = self.moments;
        [mu_cc, -mu_rc, mu_rr]
    }

    /// Eigenvalues of the inertia tensor, largest first
    fn inertia_eigvals(&self) -> [f64; 2] {
        let [a, b, c] = self.inertia_tensor();
        let half_sum = (a + c) / 2.0;
        let root = (((a - c) / 2.0).powi(2) + b * b).sqrt();
        [(half_sum + root).max(0.0), (half_sum - root).max(0.0)]
    }

    pub fn eccentricity(&self) -> f64 {
        let [l1, l2] = self.inertia_eigvals();
        if l1 == 0.0 {
            0.0
        } else {
            (1.0 - l2 / l1).max(0.0).sqrt()
        }
    }

    pub fn major_axis_length(&self) -> f64 {
        4.0 * self.inertia_eigvals()[0].sqrt()
    }

    pub fn minor_axis_length(&self) -> f64 {
        4.0 * self.inertia_eigvals()[1].sqrt()
    }

    /// Angle between the row axis and the major axis, in `[-pi/2, pi/2]`
    pub fn orientation(&self) -> f64 {
        let [a, b, c] = self.inertia_tensor();
        if a - c == 0.0 {
            if b < 0.0 {
                -FRAC_PI_4
            } else {
                FRAC_PI_4
            }
        } else {
            (0.5 * (-2.0 * b).atan2(c - a)).clamp(-FRAC_PI_2, FRAC_PI_2)
        }
    }
}

#[derive(Default)]
struct Accumulator {
    area: u64,
    sum: [f64; 2],
    sum_sq: [f64; 3],
    bbox: Option<[u32; 4]>,
    coords: Vec<[u32; 2]>,
}

/// Measure every non-background region, ordered by label
pub fn region_props(labeled: &LabeledMask) -> Vec<RegionProps> {
    let mut regions: BTreeMap<u32, Accumulator> = BTreeMap::new();

    for (x, y, pixel) in labeled.enumerate_pixels() {
        let label = pixel[0];
        if label == 0 {
            continue;
        }
        let (row, col) = (y, x);
        let (r, c) = (row as f64, col as f64);

        let acc = regions.entry(label).or_default();
        acc.area += 1;
        acc.sum[0] += r;
        acc.sum[1] += c;
        acc.sum_sq[0] += r * r;
        acc.sum_sq[1] += c * c;
        acc.sum_sq[2] += r * c;
        acc.coords.push([row, col]);
        acc.bbox = Some(match acc.bbox {
            None => [row, col, row + 1, col + 1],
            Some([r0, c0, r1, c1]) => [r0.min(row), c0.min(col), r1.max(row + 1), c1.max(col + 1)],
        });
    }

    regions
        .into_iter()
        .filter_map(|(label, acc)| {
            let bbox = acc.bbox?;
            let n = acc.area as f64;
            let centroid = [acc.sum[0] / n, acc.sum[1] / n];
            let mu_rr = acc.sum_sq[0] / n - centroid[0] * centroid[0];
            let mu_cc = acc.sum_sq[1] / n - centroid[1] * centroid[1];
            let mu_rc = acc.sum_sq[2] / n - centroid[0] * centroid[1];

            Some(RegionProps {
                label,
                area: acc.area,
                bbox,
                centroid,
                coords: acc.coords,
                moments: [mu_rr.max(0.0), mu_cc.max(0.0), mu_rc],
            })
        })
        .collect()
}
