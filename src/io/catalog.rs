//! Brand and user catalog files
//!
//! The batch driver seeds the processor's directories from two CSV files.
//!
//! Brands: `brand,name,earning_percentage,redemption_percentage,min_redemption_amount,brandwise_max_cap,max_redemption_amount,active`
//!
//! Users: `user,mobile,status`
//!
//! `max_redemption_amount` is optional and, when present, must equal
//! `brandwise_max_cap`. `active` defaults to true.

use crate::core::{
    InMemoryBrandDirectory, InMemoryUserDirectory, ProcessorConfig, TransactionProcessor,
};
use crate::types::{Brand, BrandId, BrandRules, Coins, LoyaltyError, User, UserId, UserStatus};
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Deserialize)]
struct BrandRow {
    brand: BrandId,
    name: String,
    earning_percentage: String,
    redemption_percentage: String,
    min_redemption_amount: Coins,
    brandwise_max_cap: Coins,
    #[serde(default)]
    max_redemption_amount: Option<Coins>,
    #[serde(default)]
    active: Option<bool>,
}

impl BrandRow {
    fn into_brand(self) -> Result<Brand, LoyaltyError> {
        if let Some(max) = self.max_redemption_amount {
            if max != self.brandwise_max_cap {
                return Err(LoyaltyError::InvalidBrandRules {
                    brand: self.brand,
                    message: format!(
                        "max redemption amount {} differs from brandwise max cap {}",
                        max, self.brandwise_max_cap
                    ),
                });
            }
        }

        let rules = BrandRules::new(
            self.brand,
            parse_percentage(self.brand, &self.earning_percentage)?,
            parse_percentage(self.brand, &self.redemption_percentage)?,
            self.min_redemption_amount,
            self.brandwise_max_cap,
        )?;

        Ok(Brand {
            id: self.brand,
            name: self.name,
            is_active: self.active.unwrap_or(true),
            rules,
        })
    }
}

fn parse_percentage(brand: BrandId, raw: &str) -> Result<Decimal, LoyaltyError> {
    Decimal::from_str(raw.trim()).map_err(|_| LoyaltyError::ParseError {
        line: None,
        message: format!("brand {}: invalid percentage '{}'", brand, raw),
    })
}

#[derive(Debug, Deserialize)]
struct UserRow {
    user: UserId,
    #[serde(default)]
    mobile: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl UserRow {
    fn into_user(self) -> Result<User, LoyaltyError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => UserStatus::Active,
            Some(raw) => raw
                .parse::<UserStatus>()
                .map_err(|message| LoyaltyError::ParseError {
                    line: None,
                    message: format!("user {}: {}", self.user, message),
                })?,
        };

        Ok(User {
            id: self.user,
            mobile: self.mobile.unwrap_or_default(),
            status,
        })
    }
}

fn csv_reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input)
}

/// Brands and users the processor is seeded with
#[derive(Debug, Default)]
pub struct Catalog {
    pub brands: InMemoryBrandDirectory,
    pub users: InMemoryUserDirectory,
}

impl Catalog {
    /// Load the brand file and, if given, the user file
    ///
    /// Without a user file every user is treated as active. Any malformed
    /// row fails the whole load.
    pub fn load(brands_path: &Path, users_path: Option<&Path>) -> Result<Self, LoyaltyError> {
        let brands = read_brands(std::fs::File::open(brands_path)?)?;
        let users = match users_path {
            Some(path) => read_users(std::fs::File::open(path)?)?,
            None => InMemoryUserDirectory::permissive(),
        };

        info!(
            brands = brands.len(),
            users = users.len(),
            "catalog loaded"
        );
        Ok(Self { brands, users })
    }

    /// Build a processor over this catalog
    pub fn into_processor(self, config: ProcessorConfig) -> TransactionProcessor {
        TransactionProcessor::in_memory(self.brands, self.users).with_config(config)
    }
}

/// Read a brand catalog
pub fn read_brands<R: Read>(input: R) -> Result<InMemoryBrandDirectory, LoyaltyError> {
    let directory = InMemoryBrandDirectory::new();
    for row in csv_reader(input).deserialize::<BrandRow>() {
        directory.insert(row?.into_brand()?);
    }
    Ok(directory)
}

/// Read a user catalog
pub fn read_users<R: Read>(input: R) -> Result<InMemoryUserDirectory, LoyaltyError> {
    let directory = InMemoryUserDirectory::new();
    for row in csv_reader(input).deserialize::<UserRow>() {
        directory.insert(row?.into_user()?);
    }
    Ok(directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BrandDirectory, UserDirectory};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BRAND_HEADER: &str = "brand,name,earning_percentage,redemption_percentage,min_redemption_amount,brandwise_max_cap,max_redemption_amount,active\n";

    #[test]
    fn test_read_brands() {
        let input = format!(
            "{}1,Cafe,10,50,10,2000,2000,true\n2,Books,2.5,0,0,0,,false\n",
            BRAND_HEADER
        );

        let brands = read_brands(input.as_bytes()).unwrap();

        assert_eq!(brands.len(), 2);
        let cafe = brands.get_active_brand(1).unwrap();
        assert_eq!(cafe.name, "Cafe");
        assert_eq!(cafe.rules.earning_percentage, Decimal::TEN);
        assert_eq!(cafe.rules.brandwise_max_cap, 2000);
        assert!(brands.get_active_brand(2).is_none());
    }

    #[test]
    fn test_read_brands_defaults_to_active() {
        let input = format!("{}1,Cafe,10,50,0,100,,\n", BRAND_HEADER);

        let brands = read_brands(input.as_bytes()).unwrap();

        assert!(brands.get_active_brand(1).is_some());
    }

    #[test]
    fn test_read_brands_rejects_diverging_caps() {
        let input = format!("{}1,Cafe,10,50,0,2000,1500,true\n", BRAND_HEADER);

        let err = read_brands(input.as_bytes()).unwrap_err();

        assert!(matches!(err, LoyaltyError::InvalidBrandRules { brand: 1, .. }));
    }

    #[test]
    fn test_read_brands_rejects_out_of_range_percentage() {
        let input = format!("{}1,Cafe,110,50,0,2000,,true\n", BRAND_HEADER);
        assert!(read_brands(input.as_bytes()).is_err());
    }

    #[test]
    fn test_read_brands_reports_parse_errors() {
        let input = format!("{}x,Cafe,10,50,0,2000,,true\n", BRAND_HEADER);

        let err = read_brands(input.as_bytes()).unwrap_err();

        assert!(matches!(err, LoyaltyError::ParseError { .. }));
    }

    #[test]
    fn test_read_brands_rejects_unparseable_percentage() {
        let input = format!("{}1,Cafe,ten,50,0,2000,,true\n", BRAND_HEADER);

        let err = read_brands(input.as_bytes()).unwrap_err();

        assert!(err.to_string().contains("invalid percentage 'ten'"), "got: {}", err);
    }

    #[test]
    fn test_read_users() {
        let input = "user,mobile,status\n1,+911111111111,ACTIVE\n2,+912222222222,suspended\n3,,\n";

        let users = read_users(input.as_bytes()).unwrap();

        assert_eq!(users.len(), 3);
        assert!(users.get_user(1).unwrap().is_active());
        assert_eq!(users.get_user(2).unwrap().status, UserStatus::Suspended);
        assert!(users.get_user(3).unwrap().is_active());
        assert!(users.get_user(4).is_none());
    }

    #[test]
    fn test_read_users_rejects_unknown_status() {
        let input = "user,mobile,status\n1,,BANNED\n";
        assert!(read_users(input.as_bytes()).is_err());
    }

    #[test]
    fn test_load_without_user_file_is_permissive() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "{}1,Cafe,10,50,0,2000,,true", BRAND_HEADER).unwrap();
        file.flush().unwrap();

        let catalog = Catalog::load(file.path(), None).unwrap();

        assert!(catalog.users.get_user(42).unwrap().is_active());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Catalog::load(Path::new("missing-brands.csv"), None).unwrap_err();
        assert!(matches!(err, LoyaltyError::IoError { .. }));
    }
}
