// 🏘️ City Alias Index - Free-text city names → governing province
//
// Membership forms carry the member's city as typed by the club secretary:
// comuni that are not provincial capitals, dialect/foreign spellings,
// old province names ("CARBONIA IGLESIAS"), bilingual names ("BOLZANO/BOZEN").
// Every spelling maps to the canonical province name used by the
// ReferenceGeoTable.
//
// Keys are stored normalized (trimmed + uppercased). Many aliases may point
// at the same province; a key points at exactly one.

use crate::geo::reference::ReferenceGeoTable;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

// ============================================================================
// ALIAS ENTRY
// ============================================================================

/// One row of an alias extension file (`city,province`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityAlias {
    pub city: String,
    pub province: String,
}

// ============================================================================
// CITY ALIAS INDEX
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct CityAliasIndex {
    aliases: HashMap<String, String>,
}

impl CityAliasIndex {
    /// Create new empty index
    pub fn new() -> Self {
        CityAliasIndex {
            aliases: HashMap::new(),
        }
    }

    /// Create index with the built-in alias table pre-loaded
    pub fn with_defaults() -> Self {
        let mut index = CityAliasIndex::new();
        for &(city, province) in DEFAULT_ALIASES {
            index.insert(city, province);
        }
        index
    }

    /// Normalize a key the way lookups normalize their input
    pub fn normalize_key(city: &str) -> String {
        city.trim().to_uppercase()
    }

    /// Insert an alias, returning the province it previously pointed at
    pub fn insert(&mut self, city: &str, province: &str) -> Option<String> {
        self.aliases
            .insert(Self::normalize_key(city), province.trim().to_string())
    }

    /// Exact lookup of an already-normalized key
    pub fn lookup(&self, normalized: &str) -> Option<&str> {
        self.aliases.get(normalized).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// All (alias, province) pairs, sorted by alias
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .aliases
            .iter()
            .map(|(city, province)| (city.as_str(), province.as_str()))
            .collect();
        entries.sort();
        entries
    }

    /// Merge aliases from a CSV file with a `city,province` header
    ///
    /// Returns the number of rows merged. Rows with a blank city or province
    /// are skipped; an alias that already exists is overridden.
    pub fn extend_from_csv(&mut self, path: &Path) -> Result<usize> {
        let mut rdr = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open alias file: {:?}", path))?;

        let mut merged = 0;
        for result in rdr.deserialize() {
            let alias: CityAlias = result.context("Failed to deserialize alias row")?;

            if alias.city.trim().is_empty() || alias.province.trim().is_empty() {
                debug!(?alias, "skipping blank alias row");
                continue;
            }

            if let Some(previous) = self.insert(&alias.city, &alias.province) {
                if previous != alias.province.trim() {
                    warn!(
                        city = %alias.city,
                        from = %previous,
                        to = %alias.province,
                        "alias overridden by extension file"
                    );
                }
            }
            merged += 1;
        }

        Ok(merged)
    }

    /// Aliases whose target is not a province of the reference table
    ///
    /// These still resolve, but their population join comes back empty.
    pub fn dangling_targets(&self, geo: &ReferenceGeoTable) -> Vec<CityAlias> {
        let mut dangling: Vec<CityAlias> = self
            .aliases
            .iter()
            .filter(|(_, province)| geo.province(province).is_none())
            .map(|(city, province)| CityAlias {
                city: city.clone(),
                province: province.clone(),
            })
            .collect();
        dangling.sort_by(|a, b| a.city.cmp(&b.city));
        dangling
    }
}

// ============================================================================
// BUILT-IN ALIAS TABLE
// ============================================================================

const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("MONCALIERI", "Torino"),
    ("COLLEGNO", "Torino"),
    ("RIVOLI", "Torino"),
    ("NICHELINO", "Torino"),
    ("SETTIMO TORINESE", "Torino"),
    ("GRUGLIASCO", "Torino"),
    ("CHIERI", "Torino"),
    ("PINEROLO", "Torino"),
    ("VENARIA REALE", "Torino"),
    ("IVREA", "Torino"),
    ("CARMAGNOLA", "Torino"),
    ("ORBASSANO", "Torino"),
    ("CHIVASSO", "Torino"),
    ("SUSA", "Torino"),
    ("BORGOSESIA", "Vercelli"),
    ("SANTHIÀ", "Vercelli"),
    ("SANTHIA", "Vercelli"),
    ("VARALLO", "Vercelli"),
    ("BORGOMANERO", "Novara"),
    ("TRECATE", "Novara"),
    ("GALLIATE", "Novara"),
    ("ARONA", "Novara"),
    ("OLEGGIO", "Novara"),
    ("ALBA", "Cuneo"),
    ("BRA", "Cuneo"),
    ("FOSSANO", "Cuneo"),
    ("MONDOVÌ", "Cuneo"),
    ("MONDOVI", "Cuneo"),
    ("SAVIGLIANO", "Cuneo"),
    ("SALUZZO", "Cuneo"),
    ("CANELLI", "Asti"),
    ("NIZZA MONFERRATO", "Asti"),
    ("CASALE MONFERRATO", "Alessandria"),
    ("NOVI LIGURE", "Alessandria"),
    ("TORTONA", "Alessandria"),
    ("ACQUI TERME", "Alessandria"),
    ("VALENZA", "Alessandria"),
    ("OVADA", "Alessandria"),
    ("COSSATO", "Biella"),
    ("CANDELO", "Biella"),
    ("VERBANIA", "Verbano-Cusio-Ossola"),
    ("DOMODOSSOLA", "Verbano-Cusio-Ossola"),
    ("OMEGNA", "Verbano-Cusio-Ossola"),
    ("STRESA", "Verbano-Cusio-Ossola"),
    ("VCO", "Verbano-Cusio-Ossola"),
    ("VERBANO CUSIO OSSOLA", "Verbano-Cusio-Ossola"),
    ("AOSTE", "Aosta"),
    ("SAINT-VINCENT", "Aosta"),
    ("SAINT VINCENT", "Aosta"),
    ("CHÂTILLON", "Aosta"),
    ("CHATILLON", "Aosta"),
    ("COURMAYEUR", "Aosta"),
    ("VALLE D'AOSTA", "Aosta"),
    ("VALLE DAOSTA", "Aosta"),
    ("BUSTO ARSIZIO", "Varese"),
    ("GALLARATE", "Varese"),
    ("SARONNO", "Varese"),
    ("LUINO", "Varese"),
    ("TRADATE", "Varese"),
    ("CASTELLANZA", "Varese"),
    ("CANTÙ", "Como"),
    ("CANTU", "Como"),
    ("ERBA", "Como"),
    ("OLGIATE COMASCO", "Como"),
    ("MARIANO COMENSE", "Como"),
    ("MORBEGNO", "Sondrio"),
    ("TIRANO", "Sondrio"),
    ("CHIAVENNA", "Sondrio"),
    ("LIVIGNO", "Sondrio"),
    ("BORMIO", "Sondrio"),
    ("SESTO SAN GIOVANNI", "Milano"),
    ("CINISELLO BALSAMO", "Milano"),
    ("LEGNANO", "Milano"),
    ("RHO", "Milano"),
    ("COLOGNO MONZESE", "Milano"),
    ("PADERNO DUGNANO", "Milano"),
    ("ROZZANO", "Milano"),
    ("SAN DONATO MILANESE", "Milano"),
    ("CORSICO", "Milano"),
    ("BOLLATE", "Milano"),
    ("ABBIATEGRASSO", "Milano"),
    ("MAGENTA", "Milano"),
    ("PIOLTELLO", "Milano"),
    ("SAN GIULIANO MILANESE", "Milano"),
    ("SEGRATE", "Milano"),
    ("CERNUSCO SUL NAVIGLIO", "Milano"),
    ("MELEGNANO", "Milano"),
    ("BUCCINASCO", "Milano"),
    ("SETTIMO MILANESE", "Milano"),
    ("ASSAGO", "Milano"),
    ("MILAN", "Milano"),
    ("MAILAND", "Milano"),
    ("TREVIGLIO", "Bergamo"),
    ("SERIATE", "Bergamo"),
    ("DALMINE", "Bergamo"),
    ("ROMANO DI LOMBARDIA", "Bergamo"),
    ("ALBINO", "Bergamo"),
    ("CLUSONE", "Bergamo"),
    ("CARAVAGGIO", "Bergamo"),
    ("DESENZANO DEL GARDA", "Brescia"),
    ("MONTICHIARI", "Brescia"),
    ("LUMEZZANE", "Brescia"),
    ("CHIARI", "Brescia"),
    ("ROVATO", "Brescia"),
    ("PALAZZOLO SULL'OGLIO", "Brescia"),
    ("PALAZZOLO SULLOGLIO", "Brescia"),
    ("GHEDI", "Brescia"),
    ("GARDONE VAL TROMPIA", "Brescia"),
    ("SALÒ", "Brescia"),
    ("SALO", "Brescia"),
    ("DARFO BOARIO TERME", "Brescia"),
    ("VIGEVANO", "Pavia"),
    ("VOGHERA", "Pavia"),
    ("MORTARA", "Pavia"),
    ("STRADELLA", "Pavia"),
    ("CREMA", "Cremona"),
    ("CASALMAGGIORE", "Cremona"),
    ("SONCINO", "Cremona"),
    ("CASTIGLIONE DELLE STIVIERE", "Mantova"),
    ("SUZZARA", "Mantova"),
    ("VIADANA", "Mantova"),
    ("MANTUA", "Mantova"),
    ("MERATE", "Lecco"),
    ("CALOLZIOCORTE", "Lecco"),
    ("VALMADRERA", "Lecco"),
    ("CODOGNO", "Lodi"),
    ("CASALPUSTERLENGO", "Lodi"),
    ("SANT'ANGELO LODIGIANO", "Lodi"),
    ("SANTANGELO LODIGIANO", "Lodi"),
    ("MONZA", "Monza e Brianza"),
    ("BRIANZA", "Monza e Brianza"),
    ("MONZA BRIANZA", "Monza e Brianza"),
    ("MONZA E DELLA BRIANZA", "Monza e Brianza"),
    ("DESIO", "Monza e Brianza"),
    ("SEREGNO", "Monza e Brianza"),
    ("LISSONE", "Monza e Brianza"),
    ("CESANO MADERNO", "Monza e Brianza"),
    ("LIMBIATE", "Monza e Brianza"),
    ("VIMERCATE", "Monza e Brianza"),
    ("BRUGHERIO", "Monza e Brianza"),
    ("GIUSSANO", "Monza e Brianza"),
    ("MEDA", "Monza e Brianza"),
    ("AGRATE BRIANZA", "Monza e Brianza"),
    ("ARCORE", "Monza e Brianza"),
    ("BOZEN", "Bolzano"),
    ("BOLZANO/BOZEN", "Bolzano"),
    ("BOLZANO BOZEN", "Bolzano"),
    ("ALTO ADIGE", "Bolzano"),
    ("SÜDTIROL", "Bolzano"),
    ("MERANO", "Bolzano"),
    ("MERAN", "Bolzano"),
    ("BRESSANONE", "Bolzano"),
    ("BRIXEN", "Bolzano"),
    ("BRUNICO", "Bolzano"),
    ("BRUNECK", "Bolzano"),
    ("LAIVES", "Bolzano"),
    ("VIPITENO", "Bolzano"),
    ("ROVERETO", "Trento"),
    ("PERGINE VALSUGANA", "Trento"),
    ("ARCO", "Trento"),
    ("RIVA DEL GARDA", "Trento"),
    ("CLES", "Trento"),
    ("LEVICO TERME", "Trento"),
    ("TRENTINO", "Trento"),
    ("VILLAFRANCA DI VERONA", "Verona"),
    ("LEGNAGO", "Verona"),
    ("SAN BONIFACIO", "Verona"),
    ("BUSSOLENGO", "Verona"),
    ("SAN GIOVANNI LUPATOTO", "Verona"),
    ("PESCHIERA DEL GARDA", "Verona"),
    ("BASSANO DEL GRAPPA", "Vicenza"),
    ("SCHIO", "Vicenza"),
    ("VALDAGNO", "Vicenza"),
    ("ARZIGNANO", "Vicenza"),
    ("THIENE", "Vicenza"),
    ("MONTECCHIO MAGGIORE", "Vicenza"),
    ("FELTRE", "Belluno"),
    ("CORTINA D'AMPEZZO", "Belluno"),
    ("CORTINA DAMPEZZO", "Belluno"),
    ("CORTINA", "Belluno"),
    ("AGORDO", "Belluno"),
    ("CONEGLIANO", "Treviso"),
    ("CASTELFRANCO VENETO", "Treviso"),
    ("MONTEBELLUNA", "Treviso"),
    ("VITTORIO VENETO", "Treviso"),
    ("ODERZO", "Treviso"),
    ("MOGLIANO VENETO", "Treviso"),
    ("MESTRE", "Venezia"),
    ("VENEZIA MESTRE", "Venezia"),
    ("VENEZIA-MESTRE", "Venezia"),
    ("MARGHERA", "Venezia"),
    ("LIDO DI VENEZIA", "Venezia"),
    ("CHIOGGIA", "Venezia"),
    ("SAN DONÀ DI PIAVE", "Venezia"),
    ("SAN DONA DI PIAVE", "Venezia"),
    ("JESOLO", "Venezia"),
    ("MIRANO", "Venezia"),
    ("SPINEA", "Venezia"),
    ("PORTOGRUARO", "Venezia"),
    ("DOLO", "Venezia"),
    ("VENICE", "Venezia"),
    ("ABANO TERME", "Padova"),
    ("CITTADELLA", "Padova"),
    ("ESTE", "Padova"),
    ("MONSELICE", "Padova"),
    ("ALBIGNASEGO", "Padova"),
    ("VIGONZA", "Padova"),
    ("PIOVE DI SACCO", "Padova"),
    ("SELVAZZANO DENTRO", "Padova"),
    ("PADUA", "Padova"),
    ("ADRIA", "Rovigo"),
    ("PORTO VIRO", "Rovigo"),
    ("BADIA POLESINE", "Rovigo"),
    ("CODROIPO", "Udine"),
    ("CERVIGNANO DEL FRIULI", "Udine"),
    ("LATISANA", "Udine"),
    ("TOLMEZZO", "Udine"),
    ("GEMONA DEL FRIULI", "Udine"),
    ("CIVIDALE DEL FRIULI", "Udine"),
    ("TARVISIO", "Udine"),
    ("LIGNANO SABBIADORO", "Udine"),
    ("MONFALCONE", "Gorizia"),
    ("GRADO", "Gorizia"),
    ("GRADISCA D'ISONZO", "Gorizia"),
    ("GRADISCA DISONZO", "Gorizia"),
    ("MUGGIA", "Trieste"),
    ("DUINO AURISINA", "Trieste"),
    ("DUINO-AURISINA", "Trieste"),
    ("SACILE", "Pordenone"),
    ("SPILIMBERGO", "Pordenone"),
    ("MANIAGO", "Pordenone"),
    ("CORDENONS", "Pordenone"),
    ("AZZANO DECIMO", "Pordenone"),
    ("SANREMO", "Imperia"),
    ("SAN REMO", "Imperia"),
    ("VENTIMIGLIA", "Imperia"),
    ("BORDIGHERA", "Imperia"),
    ("TAGGIA", "Imperia"),
    ("ALBENGA", "Savona"),
    ("ALASSIO", "Savona"),
    ("VARAZZE", "Savona"),
    ("FINALE LIGURE", "Savona"),
    ("CAIRO MONTENOTTE", "Savona"),
    ("LOANO", "Savona"),
    ("RAPALLO", "Genova"),
    ("CHIAVARI", "Genova"),
    ("SESTRI LEVANTE", "Genova"),
    ("CAMOGLI", "Genova"),
    ("SANTA MARGHERITA LIGURE", "Genova"),
    ("RECCO", "Genova"),
    ("LAVAGNA", "Genova"),
    ("ARENZANO", "Genova"),
    ("PORTOFINO", "Genova"),
    ("GENOA", "Genova"),
    ("SPEZIA", "La Spezia"),
    ("LASPEZIA", "La Spezia"),
    ("SARZANA", "La Spezia"),
    ("LERICI", "La Spezia"),
    ("LEVANTO", "La Spezia"),
    ("FIORENZUOLA D'ARDA", "Piacenza"),
    ("FIORENZUOLA DARDA", "Piacenza"),
    ("CASTEL SAN GIOVANNI", "Piacenza"),
    ("FIDENZA", "Parma"),
    ("SALSOMAGGIORE TERME", "Parma"),
    ("COLLECCHIO", "Parma"),
    ("REGGIO NELL'EMILIA", "Reggio Emilia"),
    ("REGGIO NELLEMILIA", "Reggio Emilia"),
    ("REGGIO NELL EMILIA", "Reggio Emilia"),
    ("REGGIO E.", "Reggio Emilia"),
    ("CORREGGIO", "Reggio Emilia"),
    ("SCANDIANO", "Reggio Emilia"),
    ("GUASTALLA", "Reggio Emilia"),
    ("CASALGRANDE", "Reggio Emilia"),
    ("CARPI", "Modena"),
    ("SASSUOLO", "Modena"),
    ("FORMIGINE", "Modena"),
    ("MIRANDOLA", "Modena"),
    ("VIGNOLA", "Modena"),
    ("CASTELFRANCO EMILIA", "Modena"),
    ("PAVULLO NEL FRIGNANO", "Modena"),
    ("MARANELLO", "Modena"),
    ("IMOLA", "Bologna"),
    ("CASALECCHIO DI RENO", "Bologna"),
    ("SAN LAZZARO DI SAVENA", "Bologna"),
    ("BUDRIO", "Bologna"),
    ("SAN GIOVANNI IN PERSICETO", "Bologna"),
    ("CASTEL MAGGIORE", "Bologna"),
    ("ZOLA PREDOSA", "Bologna"),
    ("PIANORO", "Bologna"),
    ("CENTO", "Ferrara"),
    ("COMACCHIO", "Ferrara"),
    ("ARGENTA", "Ferrara"),
    ("CODIGORO", "Ferrara"),
    ("FAENZA", "Ravenna"),
    ("LUGO", "Ravenna"),
    ("CERVIA", "Ravenna"),
    ("RUSSI", "Ravenna"),
    ("BAGNACAVALLO", "Ravenna"),
    ("MASSA LOMBARDA", "Ravenna"),
    ("FORLÌ", "Forlì-Cesena"),
    ("FORLI", "Forlì-Cesena"),
    ("CESENA", "Forlì-Cesena"),
    ("FORLI CESENA", "Forlì-Cesena"),
    ("FORLI-CESENA", "Forlì-Cesena"),
    ("FORLÌ CESENA", "Forlì-Cesena"),
    ("CESENATICO", "Forlì-Cesena"),
    ("SAVIGNANO SUL RUBICONE", "Forlì-Cesena"),
    ("FORLIMPOPOLI", "Forlì-Cesena"),
    ("RICCIONE", "Rimini"),
    ("CATTOLICA", "Rimini"),
    ("SANTARCANGELO DI ROMAGNA", "Rimini"),
    ("BELLARIA-IGEA MARINA", "Rimini"),
    ("BELLARIA IGEA MARINA", "Rimini"),
    ("MISANO ADRIATICO", "Rimini"),
    ("MASSA", "Massa-Carrara"),
    ("CARRARA", "Massa-Carrara"),
    ("MASSA CARRARA", "Massa-Carrara"),
    ("PONTREMOLI", "Massa-Carrara"),
    ("AULLA", "Massa-Carrara"),
    ("VIAREGGIO", "Lucca"),
    ("CAMAIORE", "Lucca"),
    ("CAPANNORI", "Lucca"),
    ("PIETRASANTA", "Lucca"),
    ("FORTE DEI MARMI", "Lucca"),
    ("CASTELNUOVO DI GARFAGNANA", "Lucca"),
    ("MONTECATINI TERME", "Pistoia"),
    ("PESCIA", "Pistoia"),
    ("QUARRATA", "Pistoia"),
    ("MONSUMMANO TERME", "Pistoia"),
    ("EMPOLI", "Firenze"),
    ("SCANDICCI", "Firenze"),
    ("SESTO FIORENTINO", "Firenze"),
    ("CAMPI BISENZIO", "Firenze"),
    ("BAGNO A RIPOLI", "Firenze"),
    ("FIESOLE", "Firenze"),
    ("FIGLINE E INCISA VALDARNO", "Firenze"),
    ("BORGO SAN LORENZO", "Firenze"),
    ("PONTASSIEVE", "Firenze"),
    ("FLORENCE", "Firenze"),
    ("PIOMBINO", "Livorno"),
    ("ROSIGNANO MARITTIMO", "Livorno"),
    ("CECINA", "Livorno"),
    ("PORTOFERRAIO", "Livorno"),
    ("COLLESALVETTI", "Livorno"),
    ("PONTEDERA", "Pisa"),
    ("CASCINA", "Pisa"),
    ("SAN MINIATO", "Pisa"),
    ("VOLTERRA", "Pisa"),
    ("SAN GIULIANO TERME", "Pisa"),
    ("CORTONA", "Arezzo"),
    ("MONTEVARCHI", "Arezzo"),
    ("SAN GIOVANNI VALDARNO", "Arezzo"),
    ("SANSEPOLCRO", "Arezzo"),
    ("BIBBIENA", "Arezzo"),
    ("POGGIBONSI", "Siena"),
    ("COLLE DI VAL D'ELSA", "Siena"),
    ("COLLE DI VAL DELSA", "Siena"),
    ("MONTEPULCIANO", "Siena"),
    ("CHIANCIANO TERME", "Siena"),
    ("FOLLONICA", "Grosseto"),
    ("ORBETELLO", "Grosseto"),
    ("MASSA MARITTIMA", "Grosseto"),
    ("MONTEMURLO", "Prato"),
    ("VAIANO", "Prato"),
    ("FOLIGNO", "Perugia"),
    ("CITTÀ DI CASTELLO", "Perugia"),
    ("CITTA DI CASTELLO", "Perugia"),
    ("SPOLETO", "Perugia"),
    ("GUBBIO", "Perugia"),
    ("ASSISI", "Perugia"),
    ("BASTIA UMBRA", "Perugia"),
    ("TODI", "Perugia"),
    ("MARSCIANO", "Perugia"),
    ("ORVIETO", "Terni"),
    ("NARNI", "Terni"),
    ("AMELIA", "Terni"),
    ("PESARO", "Pesaro e Urbino"),
    ("URBINO", "Pesaro e Urbino"),
    ("PESARO URBINO", "Pesaro e Urbino"),
    ("PESARO-URBINO", "Pesaro e Urbino"),
    ("FANO", "Pesaro e Urbino"),
    ("JESI", "Ancona"),
    ("SENIGALLIA", "Ancona"),
    ("FABRIANO", "Ancona"),
    ("OSIMO", "Ancona"),
    ("FALCONARA MARITTIMA", "Ancona"),
    ("CASTELFIDARDO", "Ancona"),
    ("CIVITANOVA MARCHE", "Macerata"),
    ("RECANATI", "Macerata"),
    ("TOLENTINO", "Macerata"),
    ("PORTO RECANATI", "Macerata"),
    ("ASCOLI", "Ascoli Piceno"),
    ("SAN BENEDETTO DEL TRONTO", "Ascoli Piceno"),
    ("GROTTAMMARE", "Ascoli Piceno"),
    ("PORTO SAN GIORGIO", "Fermo"),
    ("PORTO SANT'ELPIDIO", "Fermo"),
    ("PORTO SANTELPIDIO", "Fermo"),
    ("SANT'ELPIDIO A MARE", "Fermo"),
    ("CIVITAVECCHIA", "Viterbo"),
    ("TARQUINIA", "Viterbo"),
    ("CIVITA CASTELLANA", "Viterbo"),
    ("CITTADUCALE", "Rieti"),
    ("FARA IN SABINA", "Rieti"),
    ("FIUMICINO", "Roma"),
    ("GUIDONIA MONTECELIO", "Roma"),
    ("TIVOLI", "Roma"),
    ("POMEZIA", "Roma"),
    ("ANZIO", "Roma"),
    ("NETTUNO", "Roma"),
    ("VELLETRI", "Roma"),
    ("CIAMPINO", "Roma"),
    ("FRASCATI", "Roma"),
    ("LADISPOLI", "Roma"),
    ("CERVETERI", "Roma"),
    ("MARINO", "Roma"),
    ("ALBANO LAZIALE", "Roma"),
    ("COLLEFERRO", "Roma"),
    ("MONTEROTONDO", "Roma"),
    ("OSTIA", "Roma"),
    ("LIDO DI OSTIA", "Roma"),
    ("GENZANO DI ROMA", "Roma"),
    ("GROTTAFERRATA", "Roma"),
    ("ROME", "Roma"),
    ("APRILIA", "Latina"),
    ("TERRACINA", "Latina"),
    ("FORMIA", "Latina"),
    ("FONDI", "Latina"),
    ("SABAUDIA", "Latina"),
    ("CISTERNA DI LATINA", "Latina"),
    ("GAETA", "Latina"),
    ("CASSINO", "Frosinone"),
    ("SORA", "Frosinone"),
    ("ALATRI", "Frosinone"),
    ("ANAGNI", "Frosinone"),
    ("CECCANO", "Frosinone"),
    ("L AQUILA", "L'Aquila"),
    ("LAQUILA", "L'Aquila"),
    ("AQUILA", "L'Aquila"),
    ("AVEZZANO", "L'Aquila"),
    ("SULMONA", "L'Aquila"),
    ("CELANO", "L'Aquila"),
    ("GIULIANOVA", "Teramo"),
    ("ROSETO DEGLI ABRUZZI", "Teramo"),
    ("SILVI", "Teramo"),
    ("MONTESILVANO", "Pescara"),
    ("SPOLTORE", "Pescara"),
    ("CITTÀ SANT'ANGELO", "Pescara"),
    ("CITTA SANT'ANGELO", "Pescara"),
    ("CITTA SANTANGELO", "Pescara"),
    ("LANCIANO", "Chieti"),
    ("VASTO", "Chieti"),
    ("ORTONA", "Chieti"),
    ("FRANCAVILLA AL MARE", "Chieti"),
    ("SAN SALVO", "Chieti"),
    ("TERMOLI", "Campobasso"),
    ("LARINO", "Campobasso"),
    ("VENAFRO", "Isernia"),
    ("AGNONE", "Isernia"),
    ("AVERSA", "Caserta"),
    ("MARCIANISE", "Caserta"),
    ("MADDALONI", "Caserta"),
    ("SANTA MARIA CAPUA VETERE", "Caserta"),
    ("MONDRAGONE", "Caserta"),
    ("MONTESARCHIO", "Benevento"),
    ("SANT'AGATA DE' GOTI", "Benevento"),
    ("SANTAGATA DE GOTI", "Benevento"),
    ("GIUGLIANO IN CAMPANIA", "Napoli"),
    ("TORRE DEL GRECO", "Napoli"),
    ("POZZUOLI", "Napoli"),
    ("CASORIA", "Napoli"),
    ("CASTELLAMMARE DI STABIA", "Napoli"),
    ("AFRAGOLA", "Napoli"),
    ("MARANO DI NAPOLI", "Napoli"),
    ("PORTICI", "Napoli"),
    ("ERCOLANO", "Napoli"),
    ("ACERRA", "Napoli"),
    ("SORRENTO", "Napoli"),
    ("ISCHIA", "Napoli"),
    ("CAPRI", "Napoli"),
    ("NOLA", "Napoli"),
    ("POMIGLIANO D'ARCO", "Napoli"),
    ("POMIGLIANO DARCO", "Napoli"),
    ("TORRE ANNUNZIATA", "Napoli"),
    ("CASALNUOVO DI NAPOLI", "Napoli"),
    ("POMPEI", "Napoli"),
    ("NAPLES", "Napoli"),
    ("ARIANO IRPINO", "Avellino"),
    ("SOLOFRA", "Avellino"),
    ("ATRIPALDA", "Avellino"),
    ("BATTIPAGLIA", "Salerno"),
    ("CAVA DE' TIRRENI", "Salerno"),
    ("CAVA DE TIRRENI", "Salerno"),
    ("NOCERA INFERIORE", "Salerno"),
    ("EBOLI", "Salerno"),
    ("SCAFATI", "Salerno"),
    ("PAGANI", "Salerno"),
    ("AGROPOLI", "Salerno"),
    ("AMALFI", "Salerno"),
    ("POSITANO", "Salerno"),
    ("SARNO", "Salerno"),
    ("SAN SEVERO", "Foggia"),
    ("CERIGNOLA", "Foggia"),
    ("MANFREDONIA", "Foggia"),
    ("LUCERA", "Foggia"),
    ("SAN GIOVANNI ROTONDO", "Foggia"),
    ("ALTAMURA", "Bari"),
    ("MOLFETTA", "Bari"),
    ("BITONTO", "Bari"),
    ("MONOPOLI", "Bari"),
    ("CORATO", "Bari"),
    ("GRAVINA IN PUGLIA", "Bari"),
    ("MODUGNO", "Bari"),
    ("PUTIGNANO", "Bari"),
    ("CONVERSANO", "Bari"),
    ("POLIGNANO A MARE", "Bari"),
    ("BARLETTA", "Barletta-Andria-Trani"),
    ("ANDRIA", "Barletta-Andria-Trani"),
    ("TRANI", "Barletta-Andria-Trani"),
    ("BISCEGLIE", "Barletta-Andria-Trani"),
    ("CANOSA DI PUGLIA", "Barletta-Andria-Trani"),
    ("BAT", "Barletta-Andria-Trani"),
    ("BARLETTA ANDRIA TRANI", "Barletta-Andria-Trani"),
    ("MARTINA FRANCA", "Taranto"),
    ("GROTTAGLIE", "Taranto"),
    ("MASSAFRA", "Taranto"),
    ("MANDURIA", "Taranto"),
    ("FASANO", "Brindisi"),
    ("FRANCAVILLA FONTANA", "Brindisi"),
    ("OSTUNI", "Brindisi"),
    ("MESAGNE", "Brindisi"),
    ("NARDÒ", "Lecce"),
    ("NARDO", "Lecce"),
    ("GALLIPOLI", "Lecce"),
    ("GALATINA", "Lecce"),
    ("CASARANO", "Lecce"),
    ("MAGLIE", "Lecce"),
    ("OTRANTO", "Lecce"),
    ("MELFI", "Potenza"),
    ("RIONERO IN VULTURE", "Potenza"),
    ("LAURIA", "Potenza"),
    ("POLICORO", "Matera"),
    ("PISTICCI", "Matera"),
    ("BERNALDA", "Matera"),
    ("RENDE", "Cosenza"),
    ("CASTROVILLARI", "Cosenza"),
    ("CORIGLIANO-ROSSANO", "Cosenza"),
    ("CORIGLIANO ROSSANO", "Cosenza"),
    ("ROSSANO", "Cosenza"),
    ("PAOLA", "Cosenza"),
    ("ACRI", "Cosenza"),
    ("LAMEZIA TERME", "Catanzaro"),
    ("SOVERATO", "Catanzaro"),
    ("REGGIO DI CALABRIA", "Reggio Calabria"),
    ("PALMI", "Reggio Calabria"),
    ("GIOIA TAURO", "Reggio Calabria"),
    ("SIDERNO", "Reggio Calabria"),
    ("LOCRI", "Reggio Calabria"),
    ("VILLA SAN GIOVANNI", "Reggio Calabria"),
    ("ISOLA DI CAPO RIZZUTO", "Crotone"),
    ("CIRÒ MARINA", "Crotone"),
    ("CIRO MARINA", "Crotone"),
    ("VIBO", "Vibo Valentia"),
    ("TROPEA", "Vibo Valentia"),
    ("PIZZO", "Vibo Valentia"),
    ("MARSALA", "Trapani"),
    ("MAZARA DEL VALLO", "Trapani"),
    ("ALCAMO", "Trapani"),
    ("ERICE", "Trapani"),
    ("CASTELVETRANO", "Trapani"),
    ("BAGHERIA", "Palermo"),
    ("CARINI", "Palermo"),
    ("MONREALE", "Palermo"),
    ("PARTINICO", "Palermo"),
    ("TERMINI IMERESE", "Palermo"),
    ("CEFALÙ", "Palermo"),
    ("CEFALU", "Palermo"),
    ("BARCELLONA POZZO DI GOTTO", "Messina"),
    ("MILAZZO", "Messina"),
    ("TAORMINA", "Messina"),
    ("PATTI", "Messina"),
    ("SANT'AGATA DI MILITELLO", "Messina"),
    ("SANTAGATA DI MILITELLO", "Messina"),
    ("LIPARI", "Messina"),
    ("SCIACCA", "Agrigento"),
    ("LICATA", "Agrigento"),
    ("CANICATTÌ", "Agrigento"),
    ("CANICATTI", "Agrigento"),
    ("FAVARA", "Agrigento"),
    ("PORTO EMPEDOCLE", "Agrigento"),
    ("GELA", "Caltanissetta"),
    ("NISCEMI", "Caltanissetta"),
    ("PIAZZA ARMERINA", "Enna"),
    ("NICOSIA", "Enna"),
    ("LEONFORTE", "Enna"),
    ("ACIREALE", "Catania"),
    ("PATERNÒ", "Catania"),
    ("PATERNO", "Catania"),
    ("MISTERBIANCO", "Catania"),
    ("CALTAGIRONE", "Catania"),
    ("ADRANO", "Catania"),
    ("GIARRE", "Catania"),
    ("ACI CASTELLO", "Catania"),
    ("VITTORIA", "Ragusa"),
    ("MODICA", "Ragusa"),
    ("COMISO", "Ragusa"),
    ("SCICLI", "Ragusa"),
    ("AUGUSTA", "Siracusa"),
    ("AVOLA", "Siracusa"),
    ("NOTO", "Siracusa"),
    ("LENTINI", "Siracusa"),
    ("FLORIDIA", "Siracusa"),
    ("SYRACUSE", "Siracusa"),
    ("OLBIA", "Sassari"),
    ("ALGHERO", "Sassari"),
    ("PORTO TORRES", "Sassari"),
    ("TEMPIO PAUSANIA", "Sassari"),
    ("SORSO", "Sassari"),
    ("OZIERI", "Sassari"),
    ("ARZACHENA", "Sassari"),
    ("LA MADDALENA", "Sassari"),
    ("SINISCOLA", "Nuoro"),
    ("MACOMER", "Nuoro"),
    ("TORTOLÌ", "Nuoro"),
    ("TORTOLI", "Nuoro"),
    ("LANUSEI", "Nuoro"),
    ("DORGALI", "Nuoro"),
    ("QUARTU SANT'ELENA", "Cagliari"),
    ("QUARTU SANTELENA", "Cagliari"),
    ("SELARGIUS", "Cagliari"),
    ("ASSEMINI", "Cagliari"),
    ("CAPOTERRA", "Cagliari"),
    ("MONSERRATO", "Cagliari"),
    ("SESTU", "Cagliari"),
    ("PULA", "Cagliari"),
    ("TERRALBA", "Oristano"),
    ("BOSA", "Oristano"),
    ("CABRAS", "Oristano"),
    ("CARBONIA", "Sud Sardegna"),
    ("IGLESIAS", "Sud Sardegna"),
    ("SANLURI", "Sud Sardegna"),
    ("VILLACIDRO", "Sud Sardegna"),
    ("GUSPINI", "Sud Sardegna"),
    ("SANT'ANTIOCO", "Sud Sardegna"),
    ("SANTANTIOCO", "Sud Sardegna"),
    ("CARBONIA IGLESIAS", "Sud Sardegna"),
    ("CARBONIA-IGLESIAS", "Sud Sardegna"),
    ("MEDIO CAMPIDANO", "Sud Sardegna"),
];

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Write;

    #[test]
    fn test_default_keys_are_unique() {
        let keys: HashSet<&str> = DEFAULT_ALIASES.iter().map(|(city, _)| *city).collect();
        assert_eq!(keys.len(), DEFAULT_ALIASES.len());

        let index = CityAliasIndex::with_defaults();
        assert_eq!(index.len(), DEFAULT_ALIASES.len());
    }

    #[test]
    fn test_default_keys_are_normalized() {
        for (city, _) in DEFAULT_ALIASES {
            assert_eq!(&CityAliasIndex::normalize_key(city), city);
        }
    }

    #[test]
    fn test_default_targets_exist() {
        let index = CityAliasIndex::with_defaults();
        let geo = ReferenceGeoTable::italy();

        assert!(index.dangling_targets(&geo).is_empty());
    }

    #[test]
    fn test_lookup() {
        let index = CityAliasIndex::with_defaults();

        assert_eq!(index.lookup("SESTO SAN GIOVANNI"), Some("Milano"));
        assert_eq!(index.lookup("MONZA"), Some("Monza e Brianza"));
        assert_eq!(index.lookup("BOZEN"), Some("Bolzano"));
        assert_eq!(index.lookup("CARBONIA"), Some("Sud Sardegna"));
        // Lookup expects normalized input
        assert_eq!(index.lookup("monza"), None);
    }

    #[test]
    fn test_insert_normalizes_and_overrides() {
        let mut index = CityAliasIndex::new();
        assert!(index.is_empty());

        assert_eq!(index.insert("  Vigata ", "Agrigento"), None);
        assert_eq!(index.lookup("VIGATA"), Some("Agrigento"));

        assert_eq!(
            index.insert("VIGATA", "Ragusa"),
            Some("Agrigento".to_string())
        );
        assert_eq!(index.lookup("VIGATA"), Some("Ragusa"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_dangling_targets() {
        let mut index = CityAliasIndex::new();
        index.insert("MACONDO", "Aracataca");
        index.insert("RHO", "Milano");

        let dangling = index.dangling_targets(&ReferenceGeoTable::italy());
        assert_eq!(
            dangling,
            vec![CityAlias {
                city: "MACONDO".to_string(),
                province: "Aracataca".to_string(),
            }]
        );
    }

    #[test]
    fn test_extend_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "city,province").unwrap();
        writeln!(file, "vigata,Agrigento").unwrap();
        writeln!(file, " , Palermo").unwrap();
        writeln!(file, "RHO,Monza e Brianza").unwrap();
        file.flush().unwrap();

        let mut index = CityAliasIndex::with_defaults();
        let before = index.len();
        let merged = index.extend_from_csv(file.path()).unwrap();

        assert_eq!(merged, 2);
        assert_eq!(index.len(), before + 1);
        assert_eq!(index.lookup("VIGATA"), Some("Agrigento"));
        assert_eq!(index.lookup("RHO"), Some("Monza e Brianza"));
    }

    #[test]
    fn test_extend_from_missing_file_fails() {
        let mut index = CityAliasIndex::new();
        let result = index.extend_from_csv(Path::new("/definitely/not/here.csv"));

        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("Failed to open alias file"));
    }
}
