//! Customer names for the synthetic roster.
//!
//! Names cycle through a fixed list by roster position, so a roster of
//! the same size always carries the same names regardless of seed.

pub struct NameGenerator;

impl NameGenerator {
    /// Name for the customer at roster position `index`.
    pub fn for_index(index: usize) -> &'static str {
        let names = Self::full_names();
        names[index % names.len()]
    }

    pub fn full_names() -> &'static [&'static str] {
        &[
            "Alice Freeman", "Bob Smith", "Charlie Kim", "Diana Prince", "Evan Wright",
            "Fiona Gallagher", "George Miller", "Hannah Lee", "Ian Scott", "Julia Roberts",
            "Kevin Hart", "Liam Neeson", "Mia Wallace", "Noah Tremblay", "Olivia Wilde",
            "Peter Parker", "Quinn Fabray", "Ryan Gosling", "Sarah Connor", "Tony Stark",
        ]
    }
}
