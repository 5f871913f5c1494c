//! Cat and breed fixtures.
//!
//! Surrogate ids are derived from the fixture number, so `siamese_cat(1)`
//! always has the same `uuid` and tests can compare lists by identity.

use catalog_core::model::{Breed, Cat, CatId};
use uuid::Uuid;

/// Deterministic surrogate id for fixture `n`
#[must_use]
pub const fn cat_id(n: u128) -> CatId {
    CatId::from_uuid(Uuid::from_u128(n))
}

/// Siamese breed, lifespan `"12 - 15"`
#[must_use]
pub fn siamese() -> Breed {
    Breed::new("siam", "Siamese")
        .with_origin("Thailand")
        .with_temperament("Active, Agile, Clever, Sociable, Loving, Energetic")
        .with_life_span("12 - 15")
}

/// Persian breed, lifespan `"14 - 15"`
#[must_use]
pub fn persian() -> Breed {
    Breed::new("pers", "Persian")
        .with_origin("Iran (Persia)")
        .with_temperament("Affectionate, loyal, Sedate, Quiet")
        .with_life_span("14 - 15")
}

/// Maine Coon breed, lifespan `"12 - 15"`
#[must_use]
pub fn maine_coon() -> Breed {
    Breed::new("mcoo", "Maine Coon")
        .with_origin("United States")
        .with_temperament("Adaptable, Intelligent, Loving, Gentle, Independent")
        .with_life_span("12 - 15")
}

/// Cat `n` with external id `"cat-{n}"` and the given breed
#[must_use]
pub fn cat_with_breed(n: u128, breed: Breed) -> Cat {
    plain_cat(n).with_breed(breed)
}

/// Cat `n` without breeds
#[must_use]
pub fn plain_cat(n: u128) -> Cat {
    Cat::new(
        Some(format!("cat-{n}")),
        Some(format!("https://cdn2.thecatapi.com/images/cat-{n}.jpg")),
    )
    .with_uuid(cat_id(n))
    .with_size(800, 600)
}

/// Siamese cat `n`
#[must_use]
pub fn siamese_cat(n: u128) -> Cat {
    cat_with_breed(n, siamese())
}

/// Persian cat `n`
#[must_use]
pub fn persian_cat(n: u128) -> Cat {
    cat_with_breed(n, persian())
}

/// Cat `n` whose only breed has the given lifespan text
#[must_use]
pub fn cat_with_lifespan(n: u128, life_span: Option<&str>) -> Cat {
    let mut breed = Breed::new(format!("breed-{n}"), format!("Breed {n}"));
    breed.life_span = life_span.map(str::to_string);
    cat_with_breed(n, breed)
}

/// `count` Siamese cats numbered from `first`
#[must_use]
pub fn page(first: u128, count: u128) -> Vec<Cat> {
    (first..first + count).map(siamese_cat).collect()
}
