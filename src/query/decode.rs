use bson::Document;
use serde::de::DeserializeOwned;

/// Caller-owned container a find result is decoded into.
pub trait DecodeTarget {
    /// Called once before the first document of a result.
    fn reset(&mut self);

    /// # Errors
    /// Returns the deserialization error when `doc` does not fit the target type.
    fn push_document(&mut self, doc: Document) -> Result<(), bson::error::Error>;
}

impl<T: DeserializeOwned> DecodeTarget for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }

    fn push_document(&mut self, doc: Document) -> Result<(), bson::error::Error> {
        self.push(bson::deserialize_from_document(doc)?);
        Ok(())
    }
}

/// Decodes `docs` into `target`, skipping documents that fail. Returns how many were skipped.
pub(crate) fn decode_into(target: &mut (dyn DecodeTarget + Send), docs: Vec<Document>) -> usize {
    target.reset();
    let mut skipped = 0usize;
    for d in docs {
        if let Err(e) = target.push_document(d) {
            log::warn!("skipping undecodable document: {e}");
            skipped += 1;
        }
    }
    skipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        name: String,
        qty: i32,
    }

    #[test]
    fn bad_documents_are_skipped() {
        let mut out: Vec<Item> = vec![Item { name: "stale".into(), qty: 0 }];
        let docs = vec![
            doc! {"name": "a", "qty": 1},
            doc! {"name": "b", "qty": "many"},
            doc! {"name": "c", "qty": 3},
        ];
        let skipped = decode_into(&mut out, docs);
        assert_eq!(skipped, 1);
        assert_eq!(out, vec![Item { name: "a".into(), qty: 1 }, Item { name: "c".into(), qty: 3 }]);
    }
}
