//! The communes of New Caledonia refreshed by the job.

use anyhow::{Result, bail};

use crate::model::Location;

const COMMUNES: [(&str, f64, f64); 33] = [
    ("Belep", -19.72, 163.66),
    ("Boulouparis", -21.87, 166.05),
    ("Bourail", -21.57, 165.49),
    ("Canala", -21.52, 165.96),
    ("Dumbéa", -22.15, 166.45),
    ("Farino", -21.65, 165.77),
    ("Hienghène", -20.68, 164.93),
    ("Houaïlou", -21.28, 165.62),
    ("Île des Pins", -22.61, 167.45),
    ("Kaala-Gomen", -20.67, 164.40),
    ("Koné", -21.06, 164.85),
    ("Kouaoua", -21.40, 165.83),
    ("Koumac", -20.56, 164.28),
    ("La Foa", -21.71, 165.83),
    ("Lifou", -20.92, 167.21),
    ("Maré", -21.51, 167.93),
    ("Moindou", -21.69, 165.68),
    ("Mont-Dore", -22.28, 166.58),
    ("Nouméa", -22.27, 166.44),
    ("Ouégoa", -20.35, 164.43),
    ("Ouvéa", -20.64, 166.57),
    ("Païta", -22.13, 166.36),
    ("Poindimié", -20.93, 165.33),
    ("Ponerihouen", -21.07, 165.39),
    ("Pouébo", -20.40, 164.58),
    ("Pouembout", -21.13, 164.90),
    ("Poum", -20.23, 164.02),
    ("Poya", -21.35, 165.15),
    ("Sarraméa", -21.64, 165.85),
    ("Thio", -21.61, 166.21),
    ("Touho", -20.79, 165.25),
    ("Voh", -20.96, 164.70),
    ("Yaté", -22.12, 166.92),
];

/// All communes, in refresh order.
pub fn communes() -> Vec<Location> {
    COMMUNES
        .iter()
        .map(|&(name, lat, lon)| Location::new(name, lat, lon))
        .collect()
}

/// The communes named in `names`, kept in refresh order.
/// Fails if any name is not a known commune.
pub fn select(names: &[String]) -> Result<Vec<Location>> {
    let unknown: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| !COMMUNES.iter().any(|(known, _, _)| known == name))
        .collect();

    if !unknown.is_empty() {
        bail!(
            "Unknown location(s): {}. Run `meteo locations` to list them.",
            unknown.join(", ")
        );
    }

    Ok(communes()
        .into_iter()
        .filter(|loc| names.iter().any(|n| n == &loc.name))
        .collect())
}
