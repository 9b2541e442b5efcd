use std::collections::HashMap;

use once_cell::sync::Lazy;

/// A browsable genre and the catalog tag it filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub slug: &'static str,
    pub name: &'static str,
    pub tag_id: &'static str,
}

pub const CATEGORIES: &[Category] = &[
    Category { slug: "action", name: "Action", tag_id: "391b0423-d847-456f-aff0-8b0cfc03066b" },
    Category { slug: "romance", name: "Romance", tag_id: "423e2eae-a7a2-4a8b-ac03-a8351462d71d" },
    Category { slug: "comedy", name: "Comedy", tag_id: "4d32cc48-9f00-4cca-9b5a-a839f0764984" },
    Category { slug: "drama", name: "Drama", tag_id: "b9af3a63-f058-46de-a9a0-e0c13906197a" },
    Category { slug: "fantasy", name: "Fantasy", tag_id: "cdc58593-87dd-415e-bbc0-2ec27bf404cc" },
    Category { slug: "shounen", name: "Shounen", tag_id: "4e70e91b-3910-4a5c-b6d5-333753e43b60" },
    Category { slug: "shoujo", name: "Shoujo", tag_id: "a3c67850-4684-404e-9b7f-c69850ee5da6" },
    Category { slug: "slice-of-life", name: "Slice of Life", tag_id: "e5301a23-ebd9-49dd-a0cb-2add944c7fe9" },
    Category { slug: "supernatural", name: "Supernatural", tag_id: "eabc5b4c-6aff-42f3-b657-3e90cbd00b75" },
    Category { slug: "horror", name: "Horror", tag_id: "cdad7e68-1419-41dd-bdce-27753074a640" },
    Category { slug: "mystery", name: "Mystery", tag_id: "07251805-a27e-4d59-b488-f0bfbec15168" },
    Category { slug: "psychological", name: "Psychological", tag_id: "3b60b75c-a2d7-4860-ab56-05f391bb889c" },
    Category { slug: "sci-fi", name: "Sci-Fi", tag_id: "256c8bd9-4904-4360-bf4f-508a76d67183" },
    Category { slug: "adventure", name: "Adventure", tag_id: "87cc87cd-a395-47af-b27a-93258283bbc6" },
    Category { slug: "martial-arts", name: "Martial Arts", tag_id: "799c202e-7daa-44eb-9cf7-8a3c0441531e" },
];

// slug, lowercased name and tag id all resolve to the same category
static INDEX: Lazy<HashMap<String, &'static Category>> = Lazy::new(|| {
    let mut index = HashMap::new();
    for category in CATEGORIES {
        index.insert(category.slug.to_string(), category);
        index.insert(category.name.to_lowercase(), category);
        index.insert(category.tag_id.to_string(), category);
    }
    index
});

/// Look a category up by slug, display name (any case) or tag id.
pub fn find(key: &str) -> Option<&'static Category> {
    INDEX.get(&key.trim().to_lowercase()).copied()
}

/// Resolve user-facing category names into tag ids.
///
/// Returns the tag ids in input order, or the first key that did not resolve.
pub fn resolve_tag_ids<'a, I>(keys: I) -> Result<Vec<&'static str>, String>
where
    I: IntoIterator<Item = &'a str>,
{
    keys.into_iter()
        .map(|key| find(key).map(|c| c.tag_id).ok_or_else(|| key.to_string()))
        .collect()
}
