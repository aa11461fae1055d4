//! Reference tuning for the rail marketplace.

use super::super::domain::{CargoType, WagonType};

/// How well a wagon type carries a cargo type. Exhaustive so a new variant cannot be left
/// unscored by accident.
pub(crate) const fn cargo_wagon_compatibility(cargo: CargoType, wagon: WagonType) -> f64 {
    use CargoType as C;
    use WagonType as W;

    match (cargo, wagon) {
        (C::Coal, W::Gondola) => 1.0,
        (C::Coal, W::Hopper) => 0.9,
        (C::Coal, W::Boxcar) => 0.7,
        (C::Coal, W::Platform) => 0.3,
        (C::Coal, W::Tank) => 0.0,
        (C::Coal, W::Flatcar) => 0.5,
        (C::Coal, W::Refrigerator) => 0.0,

        (C::Oil, W::Tank) => 1.0,
        (C::Oil, W::Boxcar) => 0.6,
        (C::Oil, W::Hopper) => 0.2,
        (C::Oil, W::Gondola) => 0.1,
        (C::Oil, W::Platform | W::Flatcar | W::Refrigerator) => 0.0,

        (C::Grain, W::Hopper) => 1.0,
        (C::Grain, W::Gondola) => 0.8,
        (C::Grain, W::Boxcar) => 0.7,
        (C::Grain, W::Tank) => 0.0,
        (C::Grain, W::Platform | W::Flatcar) => 0.2,
        (C::Grain, W::Refrigerator) => 0.3,

        (C::Metal, W::Platform) => 1.0,
        (C::Metal, W::Flatcar) => 0.95,
        (C::Metal, W::Gondola) => 0.8,
        (C::Metal, W::Boxcar) => 0.6,
        (C::Metal, W::Hopper) => 0.2,
        (C::Metal, W::Tank | W::Refrigerator) => 0.0,

        (C::Chemical, W::Tank) => 0.95,
        (C::Chemical, W::Boxcar) => 0.8,
        (C::Chemical, W::Platform | W::Flatcar) => 0.3,
        (C::Chemical, W::Gondola) => 0.1,
        (C::Chemical, W::Hopper) => 0.0,
        (C::Chemical, W::Refrigerator) => 0.5,

        (C::Timber, W::Platform) => 1.0,
        (C::Timber, W::Flatcar) => 0.95,
        (C::Timber, W::Gondola) => 0.7,
        (C::Timber, W::Boxcar) => 0.8,
        (C::Timber, W::Hopper) => 0.2,
        (C::Timber, W::Tank | W::Refrigerator) => 0.0,

        (C::Container, W::Platform) => 1.0,
        (C::Container, W::Flatcar) => 0.95,
        (C::Container, W::Boxcar) => 0.8,
        (C::Container, W::Gondola) => 0.5,
        (C::Container, W::Hopper) => 0.1,
        (C::Container, W::Tank | W::Refrigerator) => 0.0,

        (C::Bulk, W::Gondola) => 0.9,
        (C::Bulk, W::Hopper) => 0.95,
        (C::Bulk, W::Boxcar) => 0.7,
        (C::Bulk, W::Platform | W::Flatcar) => 0.4,
        (C::Bulk, W::Tank | W::Refrigerator) => 0.0,

        (C::Other, W::Boxcar) => 0.8,
        (C::Other, W::Gondola | W::Platform | W::Flatcar) => 0.6,
        (C::Other, W::Hopper | W::Refrigerator) => 0.4,
        (C::Other, W::Tank) => 0.3,
    }
}

/// Known region pairs and their proximity. Each pair is listed once; lookups are symmetric.
pub(crate) const REGION_PROXIMITY: &[(&str, &str, f64)] = &[
    ("Кемеровская область", "Новосибирская область", 0.95),
    ("Свердловская область", "Тюменская область", 0.9),
    ("Свердловская область", "Свердловская область", 1.0),
    ("Пермский край", "Свердловская область", 0.85),
    ("Московская область", "Московская область", 1.0),
    ("Ленинградская область", "Ленинградская область", 1.0),
    ("Московская область", "Ленинградская область", 0.8),
    ("Московская область", "Тверская область", 0.9),
    ("Самарская область", "Ленинградская область", 0.7),
    ("Омская область", "Республика Татарстан", 0.75),
];
