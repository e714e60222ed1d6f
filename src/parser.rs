//! Grouping of raw box records into per-image tables.

use log::debug;
use std::collections::HashMap;

use crate::capability::{Capabilities, Capability};
use crate::error::Result;
use crate::types::{ImageAnnotationTable, RawBox, RawRecord, YoloRow};

/// Groups `(image_id, [class, cx, cy, w, h])` records into one
/// [`ImageAnnotationTable`] per image.
///
/// Distinct image ids are emitted in first-seen order and rows keep their
/// arrival order. Ids given to [`AnnotationParser::with_image_ids`] come first,
/// in that order, and get a table even when no record names them. The whole
/// source is drained on the first pull, so this stage cannot sit on an
/// unbounded stream.
pub struct AnnotationParser<I> {
    source: Option<I>,
    image_ids: Vec<String>,
    tables: std::vec::IntoIter<ImageAnnotationTable>,
}

impl<I> AnnotationParser<I>
where
    I: Iterator<Item = Result<RawRecord>>,
{
    pub fn new(source: I, capabilities: &Capabilities) -> Result<Self> {
        capabilities.require(Capability::Tabular)?;
        Ok(Self {
            source: Some(source),
            image_ids: Vec::new(),
            tables: Vec::new().into_iter(),
        })
    }

    /// Emit a table for each of `image_ids`, empty if no record names it.
    pub fn with_image_ids(mut self, image_ids: impl IntoIterator<Item = String>) -> Self {
        self.image_ids = image_ids.into_iter().collect();
        self
    }

    fn group(source: I, image_ids: Vec<String>) -> Result<Vec<ImageAnnotationTable>> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(String, Vec<YoloRow>)> = Vec::new();
        let mut records = 0usize;

        for image_id in image_ids {
            if !index.contains_key(&image_id) {
                index.insert(image_id.clone(), groups.len());
                groups.push((image_id, Vec::new()));
            }
        }

        for record in source {
            let raw = RawBox::try_from(record?)?;
            let row = YoloRow::from(&raw);
            records += 1;

            match index.get(&raw.image_id) {
                Some(&position) => groups[position].1.push(row),
                None => {
                    index.insert(raw.image_id.clone(), groups.len());
                    groups.push((raw.image_id, vec![row]));
                }
            }
        }

        debug!(
            "Grouped {} box records into {} image tables",
            records,
            groups.len()
        );

        Ok(groups
            .into_iter()
            .map(|(file, rows)| ImageAnnotationTable::new(file, rows))
            .collect())
    }
}

impl<I> Iterator for AnnotationParser<I>
where
    I: Iterator<Item = Result<RawRecord>>,
{
    type Item = Result<ImageAnnotationTable>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(source) = self.source.take() {
            match Self::group(source, std::mem::take(&mut self.image_ids)) {
                Ok(tables) => self.tables = tables.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
        self.tables.next().map(Ok)
    }
}
