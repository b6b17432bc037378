//! Maps saved uploads back onto the person-detail payload.
//!
//! The transport carries no explicit person-to-file binding. Protocol
//! invariant: photos arrive as one ordered multipart list and each person
//! consumes as many entries as it declared, off a single shared cursor, in
//! payload order. Clients must therefore upload photos in the same order as
//! the per-person counts, summed across the array. Signatures are matched
//! by base filename instead; a reference that matches no upload is cleared,
//! never an error.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::detail::PersonDetail;

/// Replace client-side file references with server scratch paths.
///
/// `photos` is the ordered list of saved photo uploads; `signatures` maps a
/// saved signature's base filename to its path.
pub fn assign_uploads(
    people: &mut [PersonDetail],
    photos: &[PathBuf],
    signatures: &HashMap<String, PathBuf>,
) {
    let mut cursor = 0usize;

    for person in people.iter_mut() {
        let declared = person.photos.len();
        let mut resolved = Vec::with_capacity(declared);
        for _ in 0..declared {
            if cursor < photos.len() {
                resolved.push(photos[cursor].to_string_lossy().into_owned());
                cursor += 1;
            }
        }
        person.photos = resolved;

        if let Some(reference) = person.signature.take() {
            let base = reference.rsplit(['/', '\\']).next().unwrap_or("");
            person.signature = signatures
                .get(base)
                .map(|path| path.to_string_lossy().into_owned());
        }
    }
}
