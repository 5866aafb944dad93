//! In-memory brand and user directories
//!
//! Brand and user administration live outside the core. These directories
//! are the read side the processor consults, seeded by the batch driver from
//! its catalog files or by tests directly.

use crate::core::traits::{BrandDirectory, UserDirectory};
use crate::types::{Brand, BrandId, User, UserId, UserStatus};
use dashmap::DashMap;

/// Partner brands by ID
#[derive(Debug, Default)]
pub struct InMemoryBrandDirectory {
    brands: DashMap<BrandId, Brand>,
}

impl InMemoryBrandDirectory {
    pub fn new() -> Self {
        Self {
            brands: DashMap::new(),
        }
    }

    /// Insert or replace a brand
    pub fn insert(&self, brand: Brand) {
        self.brands.insert(brand.id, brand);
    }

    /// Soft-deactivate a brand; returns false if it does not exist
    pub fn deactivate(&self, brand: BrandId) -> bool {
        match self.brands.get_mut(&brand) {
            Some(mut entry) => {
                entry.is_active = false;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.brands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }
}

impl BrandDirectory for InMemoryBrandDirectory {
    fn get_active_brand(&self, brand: BrandId) -> Option<Brand> {
        self.brands
            .get(&brand)
            .filter(|entry| entry.is_active)
            .map(|entry| entry.value().clone())
    }
}

/// Users by ID
///
/// A permissive directory reports unknown users as active, for inputs that
/// carry no user catalog.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<UserId, User>,
    permissive: bool,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            permissive: false,
        }
    }

    pub fn permissive() -> Self {
        Self {
            users: DashMap::new(),
            permissive: true,
        }
    }

    pub fn insert(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Change a user's status; returns false if the user is unknown
    pub fn set_status(&self, user: UserId, status: UserStatus) -> bool {
        match self.users.get_mut(&user) {
            Some(mut entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn get_user(&self, user: UserId) -> Option<User> {
        match self.users.get(&user) {
            Some(entry) => Some(entry.value().clone()),
            None if self.permissive => Some(User {
                id: user,
                mobile: String::new(),
                status: UserStatus::Active,
            }),
            None => None,
        }
    }
}
