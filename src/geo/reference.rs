// 🗺️ Reference Geo Table - Provinces, regions, metropolitan cities
//
// Static reference data for the Italian territory:
// - population per province and per region (ISTAT, 1 January 2023, rounded)
// - the 14 provinces governed by a metropolitan city
// - province → region code map
//
// Region populations are sourced independently of the province figures and
// are NOT reconciled against the sum of their provinces.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// RAW DATA
// ============================================================================

/// (code, name, population)
const REGIONS: &[(&str, &str, u64)] = &[
    ("ABR", "Abruzzo", 1_272_000),
    ("BAS", "Basilicata", 537_000),
    ("CAL", "Calabria", 1_846_000),
    ("CAM", "Campania", 5_593_000),
    ("EMR", "Emilia-Romagna", 4_437_000),
    ("FVG", "Friuli-Venezia Giulia", 1_194_000),
    ("LAZ", "Lazio", 5_715_000),
    ("LIG", "Liguria", 1_508_000),
    ("LOM", "Lombardia", 10_020_000),
    ("MAR", "Marche", 1_487_000),
    ("MOL", "Molise", 289_000),
    ("PIE", "Piemonte", 4_252_000),
    ("PUG", "Puglia", 3_907_000),
    ("SAR", "Sardegna", 1_578_000),
    ("SIC", "Sicilia", 4_814_000),
    ("TAA", "Trentino-Alto Adige", 1_077_000),
    ("TOS", "Toscana", 3_661_000),
    ("UMB", "Umbria", 856_000),
    ("VDA", "Valle d'Aosta", 123_000),
    ("VEN", "Veneto", 4_849_000),
];

/// (province, population, region code)
const PROVINCES: &[(&str, u64, &str)] = &[
    // Piemonte
    ("Torino", 2_208_000, "PIE"),
    ("Vercelli", 166_000, "PIE"),
    ("Novara", 362_000, "PIE"),
    ("Cuneo", 582_000, "PIE"),
    ("Asti", 206_000, "PIE"),
    ("Alessandria", 406_000, "PIE"),
    ("Biella", 170_000, "PIE"),
    ("Verbano-Cusio-Ossola", 154_000, "PIE"),
    // Valle d'Aosta
    ("Aosta", 123_000, "VDA"),
    // Lombardia
    ("Varese", 880_000, "LOM"),
    ("Como", 595_000, "LOM"),
    ("Sondrio", 179_000, "LOM"),
    ("Milano", 3_214_000, "LOM"),
    ("Bergamo", 1_103_000, "LOM"),
    ("Brescia", 1_254_000, "LOM"),
    ("Pavia", 535_000, "LOM"),
    ("Cremona", 351_000, "LOM"),
    ("Mantova", 404_000, "LOM"),
    ("Lecco", 333_000, "LOM"),
    ("Lodi", 227_000, "LOM"),
    ("Monza e Brianza", 870_000, "LOM"),
    // Trentino-Alto Adige
    ("Bolzano", 534_000, "TAA"),
    ("Trento", 542_000, "TAA"),
    // Veneto
    ("Verona", 924_000, "VEN"),
    ("Vicenza", 852_000, "VEN"),
    ("Belluno", 197_000, "VEN"),
    ("Treviso", 876_000, "VEN"),
    ("Venezia", 836_000, "VEN"),
    ("Padova", 933_000, "VEN"),
    ("Rovigo", 227_000, "VEN"),
    // Friuli-Venezia Giulia
    ("Udine", 516_000, "FVG"),
    ("Gorizia", 138_000, "FVG"),
    ("Trieste", 229_000, "FVG"),
    ("Pordenone", 310_000, "FVG"),
    // Liguria
    ("Imperia", 211_000, "LIG"),
    ("Savona", 268_000, "LIG"),
    ("Genova", 818_000, "LIG"),
    ("La Spezia", 216_000, "LIG"),
    // Emilia-Romagna
    ("Piacenza", 284_000, "EMR"),
    ("Parma", 453_000, "EMR"),
    ("Reggio Emilia", 529_000, "EMR"),
    ("Modena", 703_000, "EMR"),
    ("Bologna", 1_011_000, "EMR"),
    ("Ferrara", 341_000, "EMR"),
    ("Ravenna", 386_000, "EMR"),
    ("Forlì-Cesena", 393_000, "EMR"),
    ("Rimini", 338_000, "EMR"),
    // Toscana
    ("Massa-Carrara", 189_000, "TOS"),
    ("Lucca", 383_000, "TOS"),
    ("Pistoia", 289_000, "TOS"),
    ("Firenze", 984_000, "TOS"),
    ("Livorno", 328_000, "TOS"),
    ("Pisa", 417_000, "TOS"),
    ("Arezzo", 335_000, "TOS"),
    ("Siena", 264_000, "TOS"),
    ("Grosseto", 216_000, "TOS"),
    ("Prato", 257_000, "TOS"),
    // Umbria
    ("Perugia", 636_000, "UMB"),
    ("Terni", 220_000, "UMB"),
    // Marche
    ("Pesaro e Urbino", 350_000, "MAR"),
    ("Ancona", 461_000, "MAR"),
    ("Macerata", 304_000, "MAR"),
    ("Ascoli Piceno", 201_000, "MAR"),
    ("Fermo", 168_000, "MAR"),
    // Lazio
    ("Viterbo", 307_000, "LAZ"),
    ("Rieti", 151_000, "LAZ"),
    ("Roma", 4_216_000, "LAZ"),
    ("Latina", 568_000, "LAZ"),
    ("Frosinone", 466_000, "LAZ"),
    // Abruzzo
    ("L'Aquila", 289_000, "ABR"),
    ("Teramo", 298_000, "ABR"),
    ("Pescara", 313_000, "ABR"),
    ("Chieti", 372_000, "ABR"),
    // Molise
    ("Campobasso", 215_000, "MOL"),
    ("Isernia", 80_000, "MOL"),
    // Campania
    ("Caserta", 907_000, "CAM"),
    ("Benevento", 264_000, "CAM"),
    ("Napoli", 2_987_000, "CAM"),
    ("Avellino", 401_000, "CAM"),
    ("Salerno", 1_061_000, "CAM"),
    // Puglia
    ("Foggia", 597_000, "PUG"),
    ("Bari", 1_223_000, "PUG"),
    ("Taranto", 561_000, "PUG"),
    ("Brindisi", 378_000, "PUG"),
    ("Lecce", 767_000, "PUG"),
    ("Barletta-Andria-Trani", 380_000, "PUG"),
    // Basilicata
    ("Potenza", 350_000, "BAS"),
    ("Matera", 192_000, "BAS"),
    // Calabria
    ("Cosenza", 671_000, "CAL"),
    ("Catanzaro", 343_000, "CAL"),
    ("Reggio Calabria", 522_000, "CAL"),
    ("Crotone", 163_000, "CAL"),
    ("Vibo Valentia", 151_000, "CAL"),
    // Sicilia
    ("Trapani", 421_000, "SIC"),
    ("Palermo", 1_209_000, "SIC"),
    ("Messina", 599_000, "SIC"),
    ("Agrigento", 413_000, "SIC"),
    ("Caltanissetta", 250_000, "SIC"),
    ("Enna", 157_000, "SIC"),
    ("Catania", 1_068_000, "SIC"),
    ("Ragusa", 315_000, "SIC"),
    ("Siracusa", 388_000, "SIC"),
    // Sardegna
    ("Sassari", 476_000, "SAR"),
    ("Nuoro", 200_000, "SAR"),
    ("Cagliari", 420_000, "SAR"),
    ("Oristano", 150_000, "SAR"),
    ("Sud Sardegna", 340_000, "SAR"),
];

const METROPOLITAN: &[&str] = &[
    "Torino",
    "Milano",
    "Venezia",
    "Genova",
    "Bologna",
    "Firenze",
    "Roma",
    "Napoli",
    "Bari",
    "Reggio Calabria",
    "Palermo",
    "Messina",
    "Catania",
    "Cagliari",
];

// ============================================================================
// ENTITIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Province {
    pub name: String,
    pub population: u64,
    pub region_code: String,
    pub is_metropolitan: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
    pub population: u64,
}

// ============================================================================
// REFERENCE TABLE
// ============================================================================

/// Read-only geographic lookups shared by the resolver, the aggregator and
/// any other collaborator needing the same normalization.
#[derive(Debug, Clone)]
pub struct ReferenceGeoTable {
    provinces: BTreeMap<String, Province>,
    regions: BTreeMap<String, Region>,
    /// Uppercased province name → canonical name
    province_index: HashMap<String, String>,
    /// Uppercased region code or name → region code
    region_index: HashMap<String, String>,
}

impl ReferenceGeoTable {
    /// Build the table for the Italian provinces and regions
    pub fn italy() -> Self {
        let regions = REGIONS
            .iter()
            .map(|&(code, name, population)| Region {
                code: code.to_string(),
                name: name.to_string(),
                population,
            })
            .collect();

        let provinces = PROVINCES
            .iter()
            .map(|&(name, population, region_code)| Province {
                name: name.to_string(),
                population,
                region_code: region_code.to_string(),
                is_metropolitan: METROPOLITAN.contains(&name),
            })
            .collect();

        Self::from_parts(provinces, regions)
    }

    /// Build a table from explicit provinces and regions
    ///
    /// Later entries with the same name replace earlier ones.
    pub fn from_parts(provinces: Vec<Province>, regions: Vec<Region>) -> Self {
        let mut table = ReferenceGeoTable {
            provinces: BTreeMap::new(),
            regions: BTreeMap::new(),
            province_index: HashMap::new(),
            region_index: HashMap::new(),
        };

        for region in regions {
            table
                .region_index
                .insert(region.code.to_uppercase(), region.code.clone());
            table
                .region_index
                .insert(region.name.to_uppercase(), region.code.clone());
            table.regions.insert(region.code.clone(), region);
        }

        for province in provinces {
            table
                .province_index
                .insert(province.name.to_uppercase(), province.name.clone());
            table.provinces.insert(province.name.clone(), province);
        }

        table
    }

    // ========================================================================
    // PROVINCE LOOKUPS
    // ========================================================================

    pub fn province(&self, name: &str) -> Option<&Province> {
        self.provinces.get(name)
    }

    /// Case-insensitive match of a whole string against the province names
    ///
    /// Example: "REGGIO CALABRIA" → "Reggio Calabria"
    pub fn province_named(&self, name: &str) -> Option<&str> {
        self.province_index
            .get(&name.to_uppercase())
            .map(String::as_str)
    }

    /// Population of a province, `None` when the province is unknown
    pub fn province_population(&self, name: &str) -> Option<u64> {
        self.provinces.get(name).map(|p| p.population)
    }

    pub fn is_metropolitan(&self, name: &str) -> bool {
        self.provinces
            .get(name)
            .map(|p| p.is_metropolitan)
            .unwrap_or(false)
    }

    pub fn region_of(&self, province: &str) -> Option<&str> {
        self.provinces.get(province).map(|p| p.region_code.as_str())
    }

    /// All provinces, ordered by name
    pub fn provinces(&self) -> impl Iterator<Item = &Province> {
        self.provinces.values()
    }

    pub fn metropolitan_provinces(&self) -> impl Iterator<Item = &Province> {
        self.provinces.values().filter(|p| p.is_metropolitan)
    }

    pub fn province_count(&self) -> usize {
        self.provinces.len()
    }

    // ========================================================================
    // REGION LOOKUPS
    // ========================================================================

    /// Find a region by code or by name (case-insensitive)
    pub fn region(&self, key: &str) -> Option<&Region> {
        self.region_index
            .get(&key.trim().to_uppercase())
            .and_then(|code| self.regions.get(code))
    }

    pub fn region_population(&self, key: &str) -> Option<u64> {
        self.region(key).map(|r| r.population)
    }

    /// All regions, ordered by code
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    /// Sum of the populations of the provinces assigned to a region
    pub fn province_population_sum(&self, region_code: &str) -> u64 {
        self.provinces
            .values()
            .filter(|p| p.region_code == region_code)
            .map(|p| p.population)
            .sum()
    }

    /// Names listed as metropolitan in the raw data that have no province entry
    pub(crate) fn unknown_metropolitan_names() -> Vec<&'static str> {
        METROPOLITAN
            .iter()
            .filter(|name| !PROVINCES.iter().any(|(p, _, _)| p == *name))
            .copied()
            .collect()
    }
}

impl Default for ReferenceGeoTable {
    fn default() -> Self {
        Self::italy()
    }
}

// ============================================================================
// TESTS
// ============================================================================
