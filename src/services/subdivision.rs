use serde::Serialize;

use crate::error::AppError;

/// The two subdivisions. Each owns a property table whose columns differ,
/// so every column list lives here rather than in the workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Project {
    #[serde(rename = "Living Water Subdivision")]
    LivingWater,
    #[serde(rename = "Havahills Estate")]
    Havahills,
}

const LW_NUMERIC: &[&str] = &[
    "Amount",
    "Reservation",
    "Lot Area",
    "Price per sqm",
    "TCP",
    "TSP",
    "MISC FEE",
    "Net Contract Price",
    "First MA",
    "1st MA net of Advance Payment",
    "2ndto60th MA",
    "Optional: Advance Payment",
    "Year",
];

const LW_TEXT: &[&str] = &[
    "Block",
    "Lot",
    "Due Date 15/30",
    "First Due Month",
    "Realty",
    "Sales Director",
    "Owner",
    "Date of Reservation",
    "Seller Name",
    "Broker / Realty",
    "Term",
    "Status",
];

const HH_NUMERIC: &[&str] = &[
    "Amount",
    "Lot Size",
    "Price",
    "TSP",
    "Reservation",
    "Comm Price",
    "Misc Fee",
    "Vat",
    "TCP",
    "1ST MA",
    "1ST MA with Holding Fee",
    "2ND TO 48TH MA",
    "PASALO PRICE",
    "NEW MA",
];

const HH_TEXT: &[&str] = &[
    "Block",
    "Lot",
    "Due",
    "Date of Reservation",
    "First Due",
    "Terms",
    "Realty",
    "Buyers Name",
    "Seller Name",
    "Sales Director",
    "Broker",
    "Payment Scheme",
    "Vat Status",
    "Mode of Payment",
    "NEW TERM",
    "Status",
];

const LW_SEARCH: &[&str] = &["Block", "Lot", "Owner", "Seller Name", "Broker / Realty"];
const HH_SEARCH: &[&str] = &["Block", "Lot", "Buyers Name", "Seller Name", "Broker"];

const LW_EDITABLE: &[&str] = &[
    "Block",
    "Lot",
    "Owner",
    "Amount",
    "Realty",
    "Seller Name",
    "Broker / Realty",
    "Reservation",
    "Lot Area",
    "Price per sqm",
    "TCP",
    "TSP",
    "MISC FEE",
    "Net Contract Price",
    "First MA",
    "1st MA net of Advance Payment",
    "2ndto60th MA",
    "Optional: Advance Payment",
];

const HH_EDITABLE: &[&str] = &[
    "Block",
    "Lot",
    "Buyers Name",
    "Amount",
    "Realty",
    "Seller Name",
    "Sales Director",
    "Broker",
    "Lot Size",
    "Price",
    "Payment Scheme",
    "Vat Status",
    "TSP",
    "Mode of Payment",
    "Reservation",
    "Comm Price",
    "Misc Fee",
    "Vat",
    "TCP",
    "1ST MA",
    "1ST MA with Holding Fee",
    "2ND TO 48TH MA",
    "NEW TERM",
    "PASALO PRICE",
    "NEW MA",
];

// Sales Director is not carried on a Living Water sale.
const LW_SNAPSHOT: &[&str] = &[
    "Block",
    "Lot",
    "Price per sqm",
    "TCP",
    "Status",
    "First MA",
    "Owner",
    "Term",
    "Lot Area",
    "TSP",
    "MISC FEE",
    "2ndto60th MA",
    "First Due Month",
    "Date of Reservation",
    "Seller Name",
    "Broker / Realty",
    "Reservation",
    "Due Date 15/30",
    "Amount",
    "Net Contract Price",
    "Realty",
    "Optional: Advance Payment",
    "1st MA net of Advance Payment",
];

const HH_SNAPSHOT: &[&str] = &[
    "Block",
    "Lot",
    "Due",
    "Date of Reservation",
    "First Due",
    "Terms",
    "Amount",
    "Realty",
    "Buyers Name",
    "Seller Name",
    "Sales Director",
    "Broker",
    "Lot Size",
    "Price",
    "Payment Scheme",
    "Vat Status",
    "TSP",
    "Mode of Payment",
    "Reservation",
    "Comm Price",
    "Misc Fee",
    "Vat",
    "TCP",
    "1ST MA",
    "1ST MA with Holding Fee",
    "2ND TO 48TH MA",
    "NEW TERM",
    "PASALO PRICE",
    "NEW MA",
    "Status",
];

const LW_REOPEN_CLEAR: &[&str] = &[
    "Owner",
    "Due Date 15/30",
    "First Due Month",
    "Realty",
    "Date of Reservation",
    "Seller Name",
    "Broker / Realty",
];

const HH_REOPEN_CLEAR: &[&str] = &[
    "Buyers Name",
    "Due",
    "First Due",
    "Realty",
    "Date of Reservation",
    "Seller Name",
    "Broker",
    "Sales Director",
    "Mode of Payment",
];

/// Property columns that seed a new balance on sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSeed {
    pub remaining_balance: &'static str,
    pub amount: &'static str,
}

impl Project {
    pub const ALL: [Project; 2] = [Project::LivingWater, Project::Havahills];

    /// Property table name; also the value stored in `Balance.Project` and
    /// `Payment.Project`.
    pub fn table(self) -> &'static str {
        match self {
            Self::LivingWater => "Living Water Subdivision",
            Self::Havahills => "Havahills Estate",
        }
    }

    pub fn from_segment(raw: &str) -> Result<Self, AppError> {
        let normalized = raw
            .trim()
            .chars()
            .filter(|character| !matches!(character, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "livingwater" | "livingwatersubdivision" => Ok(Self::LivingWater),
            "havahills" | "havahillsestate" => Ok(Self::Havahills),
            _ => Err(AppError::BadRequest(format!("Unknown project '{raw}'."))),
        }
    }

    pub fn buyer_column(self) -> &'static str {
        match self {
            Self::LivingWater => "Owner",
            Self::Havahills => "Buyers Name",
        }
    }

    pub fn numeric_columns(self) -> &'static [&'static str] {
        match self {
            Self::LivingWater => LW_NUMERIC,
            Self::Havahills => HH_NUMERIC,
        }
    }

    pub fn text_columns(self) -> &'static [&'static str] {
        match self {
            Self::LivingWater => LW_TEXT,
            Self::Havahills => HH_TEXT,
        }
    }

    pub fn search_columns(self) -> &'static [&'static str] {
        match self {
            Self::LivingWater => LW_SEARCH,
            Self::Havahills => HH_SEARCH,
        }
    }

    pub fn editable_columns(self) -> &'static [&'static str] {
        match self {
            Self::LivingWater => LW_EDITABLE,
            Self::Havahills => HH_EDITABLE,
        }
    }

    pub fn snapshot_columns(self) -> &'static [&'static str] {
        match self {
            Self::LivingWater => LW_SNAPSHOT,
            Self::Havahills => HH_SNAPSHOT,
        }
    }

    pub fn reopen_clear_columns(self) -> &'static [&'static str] {
        match self {
            Self::LivingWater => LW_REOPEN_CLEAR,
            Self::Havahills => HH_REOPEN_CLEAR,
        }
    }

    pub fn balance_seed(self) -> BalanceSeed {
        match self {
            Self::LivingWater => BalanceSeed {
                remaining_balance: "Net Contract Price",
                amount: "First MA",
            },
            Self::Havahills => BalanceSeed {
                remaining_balance: "TCP",
                amount: "1ST MA",
            },
        }
    }

    pub fn lot_size_column(self) -> &'static str {
        match self {
            Self::LivingWater => "Lot Area",
            Self::Havahills => "Lot Size",
        }
    }

    pub fn is_numeric_column(self, column: &str) -> bool {
        self.numeric_columns().contains(&column)
    }
}

#[cfg(test)]
mod tests {
    use super::Project;

    #[test]
    fn parses_path_segments() {
        for raw in ["living-water", "LivingWater", "livingwater", "Living Water Subdivision"] {
            assert_eq!(Project::from_segment(raw).ok(), Some(Project::LivingWater));
        }
        for raw in ["havahills", "Havahills", "HAVAHILLS"] {
            assert_eq!(Project::from_segment(raw).ok(), Some(Project::Havahills));
        }
        assert!(Project::from_segment("sunrise").is_err());
    }

    #[test]
    fn snapshot_columns_follow_each_table() {
        let lw = Project::LivingWater.snapshot_columns();
        assert!(lw.contains(&"Term"));
        assert!(!lw.contains(&"Sales Director"));

        let hh = Project::Havahills.snapshot_columns();
        assert!(hh.contains(&"Sales Director"));
        assert!(hh.contains(&"NEW MA"));
    }

    #[test]
    fn editable_and_snapshot_columns_are_known_columns() {
        for project in Project::ALL {
            let known = |column: &&str| {
                project.numeric_columns().contains(column)
                    || project.text_columns().contains(column)
            };
            assert!(project.editable_columns().iter().all(known));
            assert!(project.snapshot_columns().iter().all(known));
            assert!(project.reopen_clear_columns().iter().all(known));
            assert!(project.search_columns().iter().all(known));
        }
    }

    #[test]
    fn path_segments_resolve_to_tables() {
        for project in Project::ALL {
            assert_eq!(Project::from_segment(project.table()).ok(), Some(project));
        }
        assert!(Project::from_segment("Other").is_err());
    }
}
