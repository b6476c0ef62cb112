// Geographic normalization: reference tables, city aliases, province resolution

pub mod aliases;
pub mod reference;
pub mod resolver;

pub use aliases::{CityAlias, CityAliasIndex};
pub use reference::{Province, ReferenceGeoTable, Region};
pub use resolver::{
    clean_city, normalize_city, ProvinceResolver, Resolution, ResolutionOutcome,
    ResolutionReport, ResolutionTier, UnresolvedCity,
};
