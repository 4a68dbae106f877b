//! Process-local store implementing every repository trait.
//!
//! Used by `STORAGE_BACKEND=memory` and by the HTTP tests. Records keep
//! insertion order; nothing survives a restart.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::invoices::{
    repo::InvoiceRepo,
    repo_types::{Invoice, InvoiceUpdate, NewInvoice},
};
use crate::products::{
    repo::ProductRepo,
    repo_types::{NewProduct, Product, ProductUpdate},
};
use crate::users::{
    repo::UserRepo,
    repo_types::{NewUser, User, UserUpdate},
};

#[derive(Default)]
pub struct MemoryStore {
    products: RwLock<Vec<Product>>,
    users: RwLock<Vec<User>>,
    invoices: RwLock<Vec<Invoice>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn remove_by<T>(rows: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> bool {
    let before = rows.len();
    rows.retain(|r| !pred(r));
    rows.len() != before
}

#[async_trait]
impl ProductRepo for MemoryStore {
    async fn list(&self) -> StoreResult<Vec<Product>> {
        Ok(self.products.read().await.clone())
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.products.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn insert(&self, product: NewProduct) -> StoreResult<Product> {
        let now = OffsetDateTime::now_utc();
        let product = Product {
            id: Uuid::new_v4(),
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            created_at: now,
            updated_at: now,
        };
        self.products.write().await.push(product.clone());
        Ok(product)
    }

    async fn update(&self, id: Uuid, changes: ProductUpdate) -> StoreResult<Option<Product>> {
        let mut rows = self.products.write().await;
        let Some(p) = rows.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        p.name = changes.name;
        p.description = changes.description;
        p.price = changes.price;
        p.stock = changes.stock;
        p.updated_at = OffsetDateTime::now_utc();
        Ok(Some(p.clone()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(remove_by(&mut *self.products.write().await, |p| p.id == id))
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn list(&self) -> StoreResult<Vec<User>> {
        Ok(self.users.read().await.clone())
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut rows = self.users.write().await;
        if rows.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserUpdate) -> StoreResult<Option<User>> {
        let mut rows = self.users.write().await;
        if let Some(email) = &changes.email {
            if rows.iter().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Duplicate("email"));
            }
        }
        let Some(u) = rows.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            u.name = name;
        }
        if let Some(email) = changes.email {
            u.email = email;
        }
        if let Some(hash) = changes.password_hash {
            u.password_hash = hash;
        }
        if let Some(role) = changes.role {
            u.role = role;
        }
        u.updated_at = OffsetDateTime::now_utc();
        Ok(Some(u.clone()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(remove_by(&mut *self.users.write().await, |u| u.id == id))
    }
}

#[async_trait]
impl InvoiceRepo for MemoryStore {
    async fn list(&self) -> StoreResult<Vec<Invoice>> {
        Ok(self.invoices.read().await.clone())
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Invoice>> {
        Ok(self.invoices.read().await.iter().find(|i| i.id == id).cloned())
    }

    async fn insert(&self, invoice: NewInvoice) -> StoreResult<Invoice> {
        let now = OffsetDateTime::now_utc();
        let invoice = Invoice {
            id: Uuid::new_v4(),
            user_id: invoice.user_id,
            items: invoice.items,
            total_amount: invoice.total_amount,
            status: invoice.status,
            created_at: now,
            updated_at: now,
            payment_date: None,
        };
        self.invoices.write().await.push(invoice.clone());
        Ok(invoice)
    }

    async fn update(&self, id: Uuid, changes: InvoiceUpdate) -> StoreResult<Option<Invoice>> {
        let mut rows = self.invoices.write().await;
        let Some(inv) = rows.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        if let Some(status) = changes.status {
            inv.status = status;
        }
        if inv.payment_date.is_none() {
            inv.payment_date = changes.payment_date;
        }
        inv.updated_at = OffsetDateTime::now_utc();
        Ok(Some(inv.clone()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(remove_by(&mut *self.invoices.write().await, |i| i.id == id))
    }
}
