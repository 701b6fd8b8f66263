//! Feed row normalization.
//!
//! Transforms raw rows of the open-data CSV into [`OperateurDraft`] values.
//! The feed is a legacy export: ISO-8859-3 encoded, semicolon-separated,
//! with numeric columns that sometimes carry float literals and a free-text
//! activities column from which the seven boolean flags are derived. Rows
//! that cannot be salvaged are discarded with a reason rather than aborting
//! the run.

use std::borrow::Cow;
use std::fmt;

use chrono::NaiveDate;
use csv::StringRecord;
use encoding_rs::ISO_8859_3;
use thiserror::Error;

use crate::repositories::OperateurDraft;

// Column names as published on data.gouv.fr.
const COL_SIRET: &str = "SIRET";
const COL_NUMERO_BIO: &str = "NUMERO BIO";
const COL_NOM: &str = "DENOMINATION";
const COL_CP: &str = "CODE POSTAL SIEGE SOCIAL";
const COL_DATE_ENGAGEMENT: &str = "DATEENGAGEMENT";
const COL_ACTIVITES: &str = "ACTIVITES";
const COL_ORGANISME: &str = "ORGANISME CERTIFICATEUR";

/// Why a feed row was dropped instead of inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    MissingSiret,
    InvalidSiret,
    MissingNumeroBio,
    InvalidNumeroBio,
    MissingNom,
    MissingCodePostal,
    InvalidCodePostal,
    MissingDateEngagement,
    InvalidDateEngagement,
    MissingOrganisme,
    MalformedRow,
}

impl DiscardReason {
    /// Stable snake_case label for logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            DiscardReason::MissingSiret => "missing_siret",
            DiscardReason::InvalidSiret => "invalid_siret",
            DiscardReason::MissingNumeroBio => "missing_numero_bio",
            DiscardReason::InvalidNumeroBio => "invalid_numero_bio",
            DiscardReason::MissingNom => "missing_nom",
            DiscardReason::MissingCodePostal => "missing_code_postal",
            DiscardReason::InvalidCodePostal => "invalid_code_postal",
            DiscardReason::MissingDateEngagement => "missing_date_engagement",
            DiscardReason::InvalidDateEngagement => "invalid_date_engagement",
            DiscardReason::MissingOrganisme => "missing_organisme_certificateur",
            DiscardReason::MalformedRow => "malformed_row",
        }
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feed-level failures that make the whole payload unusable.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("feed is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("feed header could not be read: {0}")]
    Header(#[from] csv::Error),
}

/// Outcome of normalizing a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Draft(OperateurDraft),
    Discarded(DiscardReason),
}

struct ColumnIndexes {
    siret: usize,
    numero_bio: usize,
    nom: usize,
    cp: usize,
    date_engagement: usize,
    /// Optional: a feed without the activities column yields all-false flags.
    activites: Option<usize>,
    organisme: usize,
}

impl ColumnIndexes {
    fn resolve(headers: &StringRecord) -> Result<Self, NormalizeError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or(NormalizeError::MissingColumn(name))
        };

        Ok(Self {
            siret: find(COL_SIRET)?,
            numero_bio: find(COL_NUMERO_BIO)?,
            nom: find(COL_NOM)?,
            cp: find(COL_CP)?,
            date_engagement: find(COL_DATE_ENGAGEMENT)?,
            activites: headers.iter().position(|h| h.trim() == COL_ACTIVITES),
            organisme: find(COL_ORGANISME)?,
        })
    }
}

/// The seven boolean activity flags, derived from the free-text column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityFlags {
    pub producteur: bool,
    pub preparateur: bool,
    pub distributeur: bool,
    pub restaurateur: bool,
    pub stockeur: bool,
    pub importateur: bool,
    pub exportateur: bool,
}

impl ActivityFlags {
    /// Case-sensitive substring tests, in the feed's own capitalization.
    pub fn from_text(text: &str) -> Self {
        Self {
            producteur: text.contains("Production"),
            preparateur: text.contains("Préparation"),
            distributeur: text.contains("Distribution"),
            restaurateur: text.contains("restauration"),
            stockeur: text.contains("stockage"),
            importateur: text.contains("importation"),
            exportateur: text.contains("exportation"),
        }
    }
}

/// Decode the raw feed payload from ISO-8859-3.
///
/// The upstream export is not UTF-8; decoding byte-for-byte keeps accented
/// names and certifier strings intact.
pub fn decode_feed(bytes: &[u8]) -> Cow<'_, str> {
    let (text, _, _) = ISO_8859_3.decode(bytes);
    text
}

/// Normalize the complete feed payload into per-row outcomes.
///
/// Header-level problems (unreadable CSV, missing required columns) fail the
/// whole feed; everything row-level becomes a [`RowOutcome::Discarded`].
pub fn normalize_feed(bytes: &[u8]) -> Result<Vec<RowOutcome>, NormalizeError> {
    let text = decode_feed(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let columns = ColumnIndexes::resolve(&headers)?;

    let mut outcomes = Vec::new();
    for record in reader.records() {
        let outcome = match record {
            Ok(record) => match parse_row(&record, &columns) {
                Ok(draft) => RowOutcome::Draft(draft),
                Err(reason) => RowOutcome::Discarded(reason),
            },
            Err(err) => {
                tracing::debug!(error = %err, "unreadable feed row");
                RowOutcome::Discarded(DiscardReason::MalformedRow)
            }
        };
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

fn parse_row(record: &StringRecord, columns: &ColumnIndexes) -> Result<OperateurDraft, DiscardReason> {
    let field = |idx: usize| record.get(idx).map(str::trim).unwrap_or_default();

    let siret_raw = field(columns.siret);
    if siret_raw.is_empty() {
        return Err(DiscardReason::MissingSiret);
    }
    let siret = siret_raw
        .parse::<i64>()
        .map_err(|_| DiscardReason::InvalidSiret)?;

    let numero_bio_raw = field(columns.numero_bio);
    if numero_bio_raw.is_empty() {
        return Err(DiscardReason::MissingNumeroBio);
    }
    // The export sometimes carries float literals; truncate to integer.
    let numero_bio =
        parse_numeric(numero_bio_raw).ok_or(DiscardReason::InvalidNumeroBio)? as i64;

    let nom = field(columns.nom);
    if nom.is_empty() {
        return Err(DiscardReason::MissingNom);
    }

    let cp_raw = field(columns.cp);
    if cp_raw.is_empty() {
        return Err(DiscardReason::MissingCodePostal);
    }
    let cp = parse_numeric(cp_raw).ok_or(DiscardReason::InvalidCodePostal)? as i32;

    let date_raw = field(columns.date_engagement);
    if date_raw.is_empty() {
        return Err(DiscardReason::MissingDateEngagement);
    }
    let date_engagement = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d")
        .map_err(|_| DiscardReason::InvalidDateEngagement)?;

    let organisme = field(columns.organisme);
    if organisme.is_empty() {
        return Err(DiscardReason::MissingOrganisme);
    }

    // Absent or empty activities text is not a discard: all flags stay false.
    let flags = columns
        .activites
        .map(|idx| ActivityFlags::from_text(field(idx)))
        .unwrap_or_default();

    Ok(OperateurDraft {
        siret,
        numero_bio,
        nom: nom.to_string(),
        cp,
        date_engagement,
        producteur: flags.producteur,
        preparateur: flags.preparateur,
        distributeur: flags.distributeur,
        restaurateur: flags.restaurateur,
        stockeur: flags.stockeur,
        importateur: flags.importateur,
        exportateur: flags.exportateur,
        organisme_certificateur: organisme.to_string(),
    })
}

/// Numeric coercion accepting integer or float literals with a finite value.
fn parse_numeric(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "SIRET;NUMERO BIO;DENOMINATION;CODE POSTAL SIEGE SOCIAL;DATEENGAGEMENT;ACTIVITES;ORGANISME CERTIFICATEUR";

    fn feed_from(rows: &[&str]) -> Vec<u8> {
        let mut text = HEADER.to_string();
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text.into_bytes()
    }

    fn single_draft(rows: &[&str]) -> OperateurDraft {
        let outcomes = normalize_feed(&feed_from(rows)).unwrap();
        assert_eq!(outcomes.len(), 1);
        match outcomes.into_iter().next().unwrap() {
            RowOutcome::Draft(draft) => draft,
            RowOutcome::Discarded(reason) => panic!("row unexpectedly discarded: {}", reason),
        }
    }

    fn single_discard(rows: &[&str]) -> DiscardReason {
        let outcomes = normalize_feed(&feed_from(rows)).unwrap();
        assert_eq!(outcomes.len(), 1);
        match outcomes.into_iter().next().unwrap() {
            RowOutcome::Discarded(reason) => reason,
            RowOutcome::Draft(draft) => panic!("row unexpectedly kept: {:?}", draft),
        }
    }

    #[test]
    fn test_valid_row() {
        let draft = single_draft(&[
            "82893944100016;116239;EARL DES OLIVIERS;75001;2019-03-15;Production, Distribution;ECOCERT FRANCE",
        ]);

        assert_eq!(draft.siret, 82893944100016);
        assert_eq!(draft.numero_bio, 116239);
        assert_eq!(draft.nom, "EARL DES OLIVIERS");
        assert_eq!(draft.cp, 75001);
        assert_eq!(
            draft.date_engagement,
            NaiveDate::from_ymd_opt(2019, 3, 15).unwrap()
        );
        assert!(draft.producteur);
        assert!(draft.distributeur);
        assert!(!draft.preparateur);
        assert!(!draft.restaurateur);
        assert!(!draft.stockeur);
        assert!(!draft.importateur);
        assert!(!draft.exportateur);
        assert_eq!(draft.organisme_certificateur, "ECOCERT FRANCE");
    }

    #[test]
    fn test_activity_flags_from_text() {
        let flags = ActivityFlags::from_text("Production, Préparation, restauration hors foyer");
        assert!(flags.producteur);
        assert!(flags.preparateur);
        assert!(flags.restaurateur);
        assert!(!flags.distributeur);

        // Matching is case-sensitive, as in the source dataset
        let flags = ActivityFlags::from_text("production, distribution");
        assert!(!flags.producteur);
        assert!(!flags.distributeur);

        let flags = ActivityFlags::from_text("stockage, importation, exportation");
        assert!(flags.stockeur);
        assert!(flags.importateur);
        assert!(flags.exportateur);
    }

    #[test]
    fn test_empty_activities_is_not_a_discard() {
        let draft = single_draft(&[
            "82893944100016;116239;EARL DES OLIVIERS;75001;2019-03-15;;ECOCERT FRANCE",
        ]);
        assert_eq!(
            ActivityFlags::default(),
            ActivityFlags {
                producteur: draft.producteur,
                preparateur: draft.preparateur,
                distributeur: draft.distributeur,
                restaurateur: draft.restaurateur,
                stockeur: draft.stockeur,
                importateur: draft.importateur,
                exportateur: draft.exportateur,
            }
        );
    }

    #[test]
    fn test_float_literals_truncate() {
        let draft = single_draft(&[
            "82893944100016;116239.0;EARL DES OLIVIERS;75001.0;2019-03-15;Production;ECOCERT FRANCE",
        ]);
        assert_eq!(draft.numero_bio, 116239);
        assert_eq!(draft.cp, 75001);
    }

    #[test]
    fn test_missing_code_postal_discards() {
        let reason = single_discard(&[
            "82893944100016;116239;EARL DES OLIVIERS;;2019-03-15;Production;ECOCERT FRANCE",
        ]);
        assert_eq!(reason, DiscardReason::MissingCodePostal);
    }

    #[test]
    fn test_unparseable_fields_discard() {
        let reason = single_discard(&[
            "82893944100016;abc;EARL DES OLIVIERS;75001;2019-03-15;Production;ECOCERT FRANCE",
        ]);
        assert_eq!(reason, DiscardReason::InvalidNumeroBio);

        let reason = single_discard(&[
            "82893944100016;116239;EARL DES OLIVIERS;75001;15/03/2019;Production;ECOCERT FRANCE",
        ]);
        assert_eq!(reason, DiscardReason::InvalidDateEngagement);

        let reason = single_discard(&[
            "pas-un-siret;116239;EARL DES OLIVIERS;75001;2019-03-15;Production;ECOCERT FRANCE",
        ]);
        assert_eq!(reason, DiscardReason::InvalidSiret);
    }

    #[test]
    fn test_missing_organisme_discards() {
        let reason = single_discard(&[
            "82893944100016;116239;EARL DES OLIVIERS;75001;2019-03-15;Production;",
        ]);
        assert_eq!(reason, DiscardReason::MissingOrganisme);
    }

    #[test]
    fn test_iso_8859_3_decoding() {
        // Â as 0xC2 and é as 0xE9, single bytes, the way the upstream
        // export encodes them.
        let mut bytes = feed_from(&[]);
        bytes.extend_from_slice(b"\n82893944100016;116239;FERME DU CH\xC2TEAU;75001;2019-03-15;Pr\xE9paration;ECOCERT FRANCE");

        let outcomes = normalize_feed(&bytes).unwrap();
        assert_eq!(outcomes.len(), 1);
        let RowOutcome::Draft(draft) = &outcomes[0] else {
            panic!("row unexpectedly discarded");
        };

        assert_eq!(draft.nom, "FERME DU CHÂTEAU");
        assert!(draft.preparateur);
    }

    #[test]
    fn test_missing_required_column_fails_feed() {
        let bytes = b"SIRET;DENOMINATION\n82893944100016;EARL".to_vec();
        let result = normalize_feed(&bytes);
        assert!(matches!(
            result,
            Err(NormalizeError::MissingColumn("NUMERO BIO"))
        ));
    }

    #[test]
    fn test_mixed_feed_counts() {
        let rows = [
            "11111111111111;1;Ferme A;75001;2019-01-01;Production;ECOCERT FRANCE",
            "22222222222222;2;Ferme B;13001;2020-02-02;Distribution;BUREAU VERITAS",
            ";3;Ferme C;31000;2020-03-03;Production;ECOCERT FRANCE",
            "44444444444444;4;;31000;2020-03-03;Production;ECOCERT FRANCE",
        ];
        let outcomes = normalize_feed(&feed_from(&rows)).unwrap();

        let kept = outcomes
            .iter()
            .filter(|o| matches!(o, RowOutcome::Draft(_)))
            .count();
        let dropped = outcomes
            .iter()
            .filter(|o| matches!(o, RowOutcome::Discarded(_)))
            .count();
        assert_eq!(kept, 2);
        assert_eq!(dropped, 2);
    }
}
