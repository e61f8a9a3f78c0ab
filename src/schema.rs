// Three-tier extraction schemas for E-Defter ledgers
use crate::{model::QName, Error, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

/// Fixed anchors of the ledger hierarchy.
pub mod anchors {
    use crate::model::QName;

    pub fn defter() -> QName {
        QName::new("edefter", "defter")
    }

    pub fn accounting_entries() -> QName {
        QName::new("gl-cor", "accountingEntries")
    }

    pub fn entry_header() -> QName {
        QName::new("gl-cor", "entryHeader")
    }

    pub fn entry_detail() -> QName {
        QName::new("gl-cor", "entryDetail")
    }
}

// Document metadata and accountant information, one row per posting line.
const HEADER_ACCOUNTING_ENTRIES: &[(&str, &str)] = &[
    ("gl-cor", "uniqueID"),
    ("gl-cor", "creationDate"),
    ("gl-cor", "entriesComment"),
    ("gl-cor", "periodCoveredStart"),
    ("gl-cor", "periodCoveredEnd"),
    ("gl-cor", "sourceApplication"),
    ("gl-cor", "organizationIdentifier"),
    ("gl-cor", "businessDescription"),
    ("gl-bus", "fiscalYearStart"),
    ("gl-bus", "fiscalYearEnd"),
    ("gl-cor", "accountantName"),
    ("gl-cor", "accountantEngagementTypeDescription"),
];

const HEADER_ENTRY_HEADER: &[(&str, &str)] = &[
    ("gl-cor", "enteredBy"),
    ("gl-cor", "enteredDate"),
    ("gl-cor", "entryNumber"),
    ("gl-cor", "entryNumberCounter"),
];

const HEADER_ENTRY_DETAIL: &[(&str, &str)] = &[
    ("gl-cor", "lineNumber"),
    ("gl-cor", "lineNumberCounter"),
    ("gl-cor", "documentType"),
    ("gl-cor", "documentNumber"),
    ("gl-cor", "documentReference"),
    ("gl-cor", "documentDate"),
    ("gl-cor", "documentTypeDescription"),
    ("gl-cor", "paymentMethod"),
    ("gl-cor", "postingDate"),
];

// Posting amounts and account codes.
const DETAIL_ACCOUNTING_ENTRIES: &[(&str, &str)] = &[
    ("gl-cor", "uniqueID"),
    ("gl-cor", "periodCoveredStart"),
    ("gl-cor", "periodCoveredEnd"),
    ("gl-bus", "organizationIdentifier"),
    ("gl-bus", "fiscalYearStart"),
    ("gl-bus", "fiscalYearEnd"),
];

const DETAIL_ENTRY_HEADER: &[(&str, &str)] = &[
    ("gl-cor", "entryNumber"),
    ("gl-cor", "enteredDate"),
    ("gl-cor", "entryNumberCounter"),
    ("gl-cor", "entryComment"),
    ("gl-bus", "totalDebit"),
    ("gl-bus", "totalCredit"),
];

const DETAIL_ENTRY_DETAIL: &[(&str, &str)] = &[
    ("gl-cor", "lineNumber"),
    ("gl-cor", "lineNumberCounter"),
    ("gl-cor", "accountMainID"),
    ("gl-cor", "accountMainDescription"),
    ("gl-cor", "accountSubID"),
    ("gl-cor", "accountSubDescription"),
    ("gl-cor", "amount"),
    ("gl-cor", "debitCreditCode"),
    ("gl-cor", "postingDate"),
    ("gl-cor", "documentType"),
    ("gl-cor", "documentNumber"),
    ("gl-cor", "documentDate"),
    ("gl-cor", "detailComment"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVariant {
    Header,
    Detail,
}

impl SchemaVariant {
    pub const ALL: [SchemaVariant; 2] = [SchemaVariant::Header, SchemaVariant::Detail];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVariant::Header => "header",
            SchemaVariant::Detail => "detail",
        }
    }
}

impl FromStr for SchemaVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "header" => Ok(SchemaVariant::Header),
            "detail" => Ok(SchemaVariant::Detail),
            _ => Err(Error::Schema(format!(
                "unknown schema variant '{}' (expected header or detail)",
                s
            ))),
        }
    }
}

/// Tag names to extract at each level of the ledger.
///
/// Every local name is unique across the three tiers, so each flattened
/// record carries exactly one column per listed tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchema")]
pub struct Schema {
    name: CompactString,
    accounting_entries: Vec<QName>,
    entry_header: Vec<QName>,
    entry_detail: Vec<QName>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSchema {
    #[serde(default)]
    name: CompactString,
    #[serde(default)]
    accounting_entries: Vec<QName>,
    #[serde(default)]
    entry_header: Vec<QName>,
    #[serde(default)]
    entry_detail: Vec<QName>,
}

impl TryFrom<RawSchema> for Schema {
    type Error = Error;

    fn try_from(raw: RawSchema) -> Result<Self> {
        Schema::new(
            raw.name.as_str(),
            raw.accounting_entries,
            raw.entry_header,
            raw.entry_detail,
        )
    }
}

impl Schema {
    pub fn new(
        name: &str,
        accounting_entries: Vec<QName>,
        entry_header: Vec<QName>,
        entry_detail: Vec<QName>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for tag in accounting_entries
            .iter()
            .chain(&entry_header)
            .chain(&entry_detail)
        {
            if !seen.insert(tag.local()) {
                return Err(Error::Schema(format!(
                    "column '{}' is listed more than once",
                    tag.local()
                )));
            }
        }

        Ok(Self {
            name: CompactString::from(name),
            accounting_entries,
            entry_header,
            entry_detail,
        })
    }

    fn from_static(
        name: &str,
        accounting_entries: &[(&str, &str)],
        entry_header: &[(&str, &str)],
        entry_detail: &[(&str, &str)],
    ) -> Self {
        let tier = |pairs: &[(&str, &str)]| -> Vec<QName> {
            pairs
                .iter()
                .map(|(prefix, local)| QName::new(prefix, local))
                .collect()
        };
        Self {
            name: CompactString::from(name),
            accounting_entries: tier(accounting_entries),
            entry_header: tier(entry_header),
            entry_detail: tier(entry_detail),
        }
    }

    /// Document metadata and accountant oriented extraction.
    pub fn header() -> Self {
        Self::from_static(
            SchemaVariant::Header.as_str(),
            HEADER_ACCOUNTING_ENTRIES,
            HEADER_ENTRY_HEADER,
            HEADER_ENTRY_DETAIL,
        )
    }

    /// Posting oriented extraction: account codes, amounts, debit/credit.
    pub fn detail() -> Self {
        Self::from_static(
            SchemaVariant::Detail.as_str(),
            DETAIL_ACCOUNTING_ENTRIES,
            DETAIL_ENTRY_HEADER,
            DETAIL_ENTRY_DETAIL,
        )
    }

    pub fn variant(variant: SchemaVariant) -> Self {
        match variant {
            SchemaVariant::Header => Self::header(),
            SchemaVariant::Detail => Self::detail(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// A built-in variant name, or else a path to a JSON schema file.
    pub fn resolve(source: &str) -> Result<Self> {
        match source.parse::<SchemaVariant>() {
            Ok(variant) => Ok(Self::variant(variant)),
            Err(_) if Path::new(source).is_file() => {
                log::debug!("loading schema from {}", source);
                Self::from_json_file(source)
            }
            Err(_) => Err(Error::Schema(format!(
                "'{}' is neither a built-in schema (header, detail) nor an existing schema file",
                source
            ))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accounting_entries(&self) -> &[QName] {
        &self.accounting_entries
    }

    pub fn entry_header(&self) -> &[QName] {
        &self.entry_header
    }

    pub fn entry_detail(&self) -> &[QName] {
        &self.entry_detail
    }

    /// Number of columns in every record produced with this schema.
    pub fn width(&self) -> usize {
        self.accounting_entries.len() + self.entry_header.len() + self.entry_detail.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.accounting_entries
            .iter()
            .chain(&self.entry_header)
            .chain(&self.entry_detail)
            .map(QName::local)
    }
}
