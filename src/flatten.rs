//! Hierarchical attribute flattening.
//!
//! A ledger nests three levels deep:
//!
//! ```text
//! edefter:defter
//! └── gl-cor:accountingEntries      document-level fields
//!     └── gl-cor:entryHeader *      header-level fields
//!         └── gl-cor:entryDetail *  one output record each
//! ```
//!
//! Every entry detail becomes one [`Record`] that also carries the fields of
//! its header and of the accounting entries, so the output loads directly
//! into a single table.

use crate::model::{QName, Record};
use crate::schema::{anchors, Schema};
use crate::tree::ElementTree;
use crate::{Error, Result};

pub struct Flattener<'s> {
    schema: &'s Schema,
}

impl<'s> Flattener<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }

    /// Records in document order: headers outer, details inner.
    ///
    /// Fails with [`Error::Structure`] when `edefter:defter` or
    /// `gl-cor:accountingEntries` is missing. Tree lookup failures are
    /// returned as-is. Missing leaf tags never fail; their column is `None`.
    pub fn flatten<T: ElementTree>(&self, tree: &T) -> Result<Vec<Record>> {
        let width = self.schema.width();
        let entries = locate_entries(tree)?;

        let mut document_fields = Record::with_capacity(width);
        extract_into(&mut document_fields, tree, entries, self.schema.accounting_entries())?;

        let entry_detail = anchors::entry_detail();
        let mut records = Vec::new();
        let headers = tree.find_all(entries, &anchors::entry_header())?;

        for header in &headers {
            // Each level starts from a copy of its parent's fields; the parent
            // record is never extended in place.
            let mut header_fields = document_fields.clone();
            extract_into(&mut header_fields, tree, *header, self.schema.entry_header())?;

            for detail in tree.find_all(*header, &entry_detail)? {
                let mut record = header_fields.clone();
                extract_into(&mut record, tree, detail, self.schema.entry_detail())?;
                records.push(record);
            }
        }

        log::debug!(
            "flattened {} headers into {} records ({} columns, schema '{}')",
            headers.len(),
            records.len(),
            width,
            self.schema.name()
        );
        Ok(records)
    }
}

/// Shorthand for `Flattener::new(schema).flatten(tree)`.
pub fn flatten<T: ElementTree>(tree: &T, schema: &Schema) -> Result<Vec<Record>> {
    Flattener::new(schema).flatten(tree)
}

/// Walks `edefter:defter` → `gl-cor:accountingEntries` from the tree root.
pub(crate) fn locate_entries<T: ElementTree>(tree: &T) -> Result<T::Node> {
    let defter_name = anchors::defter();
    let defter = tree
        .find_first(tree.root(), &defter_name)?
        .ok_or_else(|| Error::Structure(format!("missing <{}> element", defter_name)))?;

    let entries_name = anchors::accounting_entries();
    tree.find_first(defter, &entries_name)?.ok_or_else(|| {
        Error::Structure(format!(
            "missing <{}> under <{}>",
            entries_name, defter_name
        ))
    })
}

fn extract_into<T: ElementTree>(
    record: &mut Record,
    tree: &T,
    scope: T::Node,
    tags: &[QName],
) -> Result<()> {
    for tag in tags {
        let value = match tree.find_first(scope, tag)? {
            Some(node) => Some(tree.text(node)?),
            None => None,
        };
        record.push(tag.local(), value);
    }
    Ok(())
}
