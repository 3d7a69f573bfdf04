use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::import::slugify;

// ============================================================================
// ENUMS
// ============================================================================

/// Listing visibility status (this is also a Postgres enum)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "listing_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Pending,
    Active,
}

/// Review moderation status (also a Postgres enum)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "review_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

/// What a visitor clicked on a listing page
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "click_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClickType {
    Phone,
    Email,
    Website,
    Directions,
    Social,
}

impl ClickType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClickType::Phone => "phone",
            ClickType::Email => "email",
            ClickType::Website => "website",
            ClickType::Directions => "directions",
            ClickType::Social => "social",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "property_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    House,
    Apartment,
    Land,
    Commercial,
    Villa,
}

/// Whether a property is offered for sale or for rent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "property_listing_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PropertyListingType {
    Sale,
    Rent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "property_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Available,
    UnderContract,
    Sold,
    Rented,
}

impl PropertyStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, PropertyStatus::Sold | PropertyStatus::Rented)
    }
}

// ============================================================================
// LOOKUPS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Administrative region of Antigua & Barbuda
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Parish {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// LISTINGS
// ============================================================================

/// Business profile shown in the directory
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Listing {
    pub id: Uuid,
    pub business_name: String,
    pub slug: String,
    pub category_id: Uuid,
    pub parish_id: Uuid,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub google_business_url: Option<String>,
    pub tripadvisor_url: Option<String>,
    pub twitter_url: Option<String>,
    pub status: ListingStatus,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Helper struct used when inserting a new listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewListing {
    pub id: Uuid,
    pub business_name: String,
    pub slug: String,
    pub category_id: Uuid,
    pub parish_id: Uuid,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub google_business_url: Option<String>,
    pub tripadvisor_url: Option<String>,
    pub twitter_url: Option<String>,
    pub status: ListingStatus,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewListing {
    #[cfg(test)]
    pub fn into_listing(self) -> Listing {
        Listing {
            id: self.id,
            business_name: self.business_name,
            slug: self.slug,
            category_id: self.category_id,
            parish_id: self.parish_id,
            short_description: self.short_description,
            description: self.description,
            phone: self.phone,
            email: self.email,
            website: self.website,
            address: self.address,
            latitude: self.latitude,
            longitude: self.longitude,
            facebook_url: self.facebook_url,
            instagram_url: self.instagram_url,
            google_business_url: self.google_business_url,
            tripadvisor_url: self.tripadvisor_url,
            twitter_url: self.twitter_url,
            status: self.status,
            is_featured: self.is_featured,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Filters accepted by the public directory listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingFilter {
    pub category: Option<String>,
    pub parish: Option<String>,
    pub q: Option<String>,
    pub featured: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Listing page with the data needed to render it
#[derive(Debug, Clone, Serialize)]
pub struct ListingDetail {
    pub listing: Listing,
    pub category: Option<Category>,
    pub parish: Option<Parish>,
    pub reviews: Vec<Review>,
    pub review_count: usize,
    pub average_rating: Option<f64>,
}

impl ListingDetail {
    pub fn new(
        listing: Listing,
        category: Option<Category>,
        parish: Option<Parish>,
        reviews: Vec<Review>,
    ) -> Self {
        let review_count = reviews.len();
        let average_rating = if reviews.is_empty() {
            None
        } else {
            let sum: i32 = reviews.iter().map(|r| r.rating).sum();
            Some(f64::from(sum) / review_count as f64)
        };

        Self {
            listing,
            category,
            parish,
            reviews,
            review_count,
            average_rating,
        }
    }
}

// ============================================================================
// CLAIMS & REVIEWS
// ============================================================================

/// Association between a user and a listing they assert ownership of
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClaimedListing {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub user_id: Uuid,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub user_id: Option<Uuid>,
    pub reviewer_name: String,
    pub reviewer_email: Option<String>,
    pub rating: i32,
    pub comment: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub user_id: Option<Uuid>,
    pub reviewer_name: String,
    pub reviewer_email: Option<String>,
    pub rating: i32,
    pub comment: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// ANALYTICS EVENTS (append-only)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PageviewEvent {
    pub id: Uuid,
    pub listing_id: Option<Uuid>,
    pub page_path: String,
    pub referrer: Option<String>,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SearchEvent {
    pub id: Uuid,
    pub search_query: String,
    pub category_id: Option<Uuid>,
    pub parish_id: Option<Uuid>,
    pub results_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClickEvent {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub click_type: ClickType,
    pub created_at: DateTime<Utc>,
}

/// Minimal listing projection used to label analytics buckets
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ListingLabel {
    pub id: Uuid,
    pub business_name: String,
    pub category_id: Uuid,
    pub parish_id: Uuid,
    pub status: ListingStatus,
}

/// One grouped count in an analytics widget
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountBucket {
    pub key: String,
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

// ============================================================================
// REAL ESTATE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Property {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: i64,
    pub property_type: PropertyType,
    pub listing_type: PropertyListingType,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub square_feet: Option<i32>,
    pub parish_id: Option<Uuid>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_urls: Vec<String>,
    pub status: PropertyStatus,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyFilter {
    pub listing_type: Option<PropertyListingType>,
    pub property_type: Option<PropertyType>,
    pub parish: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_bedrooms: Option<i32>,
    pub include_closed: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PropertyInquiry {
    pub id: Uuid,
    pub property_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// REQUEST/RESPONSE DTOs
// ============================================================================

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

/// One page of results plus the totals needed for pagination controls
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

/// Normalizes 1-based page parameters into (page, per_page, offset)
pub fn page_window(page: Option<i64>, per_page: Option<i64>) -> (i64, i64, i64) {
    let per_page = per_page.unwrap_or(12).clamp(1, 100);
    let page = page.unwrap_or(1).max(1);
    (page, per_page, (page - 1).saturating_mul(per_page))
}

/// Payload sent by the public "add your business" form
#[derive(Debug, Deserialize, Validate)]
pub struct CreateListingRequest {
    #[validate(length(min = 2, max = 160))]
    pub business_name: String,
    pub category_id: Uuid,
    pub parish_id: Uuid,
    #[validate(length(max = 300))]
    pub short_description: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(url)]
    pub facebook_url: Option<String>,
    #[validate(url)]
    pub instagram_url: Option<String>,
    #[validate(url)]
    pub google_business_url: Option<String>,
    #[validate(url)]
    pub tripadvisor_url: Option<String>,
    #[validate(url)]
    pub twitter_url: Option<String>,
}

impl CreateListingRequest {
    pub fn validate_business_rules(&self) -> Result<(), String> {
        if self.latitude.is_some() != self.longitude.is_some() {
            return Err("Latitude and longitude must be provided together".into());
        }

        if slugify(&self.business_name).is_empty() {
            return Err("Business name must contain at least one letter or digit".into());
        }

        Ok(())
    }

    pub fn into_new_listing(self) -> NewListing {
        let now = Utc::now();
        NewListing {
            id: Uuid::new_v4(),
            slug: slugify(&self.business_name),
            business_name: self.business_name.trim().to_string(),
            category_id: self.category_id,
            parish_id: self.parish_id,
            short_description: self.short_description,
            description: self.description,
            phone: self.phone,
            email: self.email,
            website: self.website,
            address: self.address,
            latitude: self.latitude,
            longitude: self.longitude,
            facebook_url: self.facebook_url,
            instagram_url: self.instagram_url,
            google_business_url: self.google_business_url,
            tripadvisor_url: self.tripadvisor_url,
            twitter_url: self.twitter_url,
            status: ListingStatus::Pending,
            is_featured: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Full replacement of an existing listing by an admin
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateListingRequest {
    #[validate(length(min = 2, max = 160))]
    pub business_name: String,
    pub category_id: Uuid,
    pub parish_id: Uuid,
    #[validate(length(max = 300))]
    pub short_description: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(url)]
    pub facebook_url: Option<String>,
    #[validate(url)]
    pub instagram_url: Option<String>,
    #[validate(url)]
    pub google_business_url: Option<String>,
    #[validate(url)]
    pub tripadvisor_url: Option<String>,
    #[validate(url)]
    pub twitter_url: Option<String>,
    pub status: ListingStatus,
    pub is_featured: bool,
}

impl UpdateListingRequest {
    pub fn validate_business_rules(&self) -> Result<(), String> {
        if self.latitude.is_some() != self.longitude.is_some() {
            return Err("Latitude and longitude must be provided together".into());
        }

        if slugify(&self.business_name).is_empty() {
            return Err("Business name must contain at least one letter or digit".into());
        }

        Ok(())
    }

    /// Renaming a business also moves its public slug.
    pub fn apply_to_existing(&self, existing: &mut Listing) {
        existing.business_name = self.business_name.trim().to_string();
        existing.slug = slugify(&self.business_name);
        existing.category_id = self.category_id;
        existing.parish_id = self.parish_id;
        existing.short_description = self.short_description.clone();
        existing.description = self.description.clone();
        existing.phone = self.phone.clone();
        existing.email = self.email.clone();
        existing.website = self.website.clone();
        existing.address = self.address.clone();
        existing.latitude = self.latitude;
        existing.longitude = self.longitude;
        existing.facebook_url = self.facebook_url.clone();
        existing.instagram_url = self.instagram_url.clone();
        existing.google_business_url = self.google_business_url.clone();
        existing.tripadvisor_url = self.tripadvisor_url.clone();
        existing.twitter_url = self.twitter_url.clone();
        existing.status = self.status;
        existing.is_featured = self.is_featured;
        existing.updated_at = Utc::now();
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateListingStatusRequest {
    pub status: ListingStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(length(min = 2, max = 120))]
    pub reviewer_name: String,
    #[validate(email)]
    pub reviewer_email: Option<String>,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(min = 10, max = 2000))]
    pub comment: String,
}

impl CreateReviewRequest {
    pub fn into_new_review(self, listing_id: Uuid, user_id: Option<Uuid>) -> NewReview {
        NewReview {
            id: Uuid::new_v4(),
            listing_id,
            user_id,
            reviewer_name: self.reviewer_name.trim().to_string(),
            reviewer_email: self.reviewer_email,
            rating: self.rating,
            comment: self.comment,
            status: ReviewStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Moderation decision sent by an admin
#[derive(Debug, Deserialize)]
pub struct ModerateReviewRequest {
    pub status: ReviewStatus,
}

impl ModerateReviewRequest {
    pub fn validate_business_rules(&self) -> Result<(), String> {
        if self.status == ReviewStatus::Pending {
            return Err("Moderation status must be approved or rejected".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct TrackPageviewRequest {
    pub listing_id: Option<Uuid>,
    #[validate(length(min = 1, max = 2048))]
    pub page_path: String,
    #[validate(length(max = 2048))]
    pub referrer: Option<String>,
    #[validate(length(max = 128))]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TrackSearchRequest {
    #[validate(length(max = 256))]
    pub search_query: String,
    pub category_id: Option<Uuid>,
    pub parish_id: Option<Uuid>,
    #[validate(range(min = 0))]
    pub results_count: i32,
}

#[derive(Debug, Deserialize)]
pub struct TrackClickRequest {
    pub listing_id: Uuid,
    pub click_type: ClickType,
}

/// Create or replace a property (admin)
#[derive(Debug, Deserialize, Validate)]
pub struct PropertyRequest {
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    #[validate(length(max = 8000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub price: i64,
    pub property_type: PropertyType,
    pub listing_type: PropertyListingType,
    #[validate(range(min = 0, max = 100))]
    pub bedrooms: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub bathrooms: Option<i32>,
    #[validate(range(min = 0))]
    pub square_feet: Option<i32>,
    pub parish_id: Option<Uuid>,
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub status: Option<PropertyStatus>,
    #[serde(default)]
    pub is_featured: bool,
}

impl PropertyRequest {
    pub fn validate_business_rules(&self) -> Result<(), String> {
        if self.property_type == PropertyType::Land
            && (self.bedrooms.unwrap_or(0) > 0 || self.bathrooms.unwrap_or(0) > 0)
        {
            return Err("Land cannot have bedrooms or bathrooms".into());
        }

        if self.listing_type == PropertyListingType::Sale
            && self.status == Some(PropertyStatus::Rented)
        {
            return Err("A property for sale cannot be marked as rented".into());
        }

        if self.listing_type == PropertyListingType::Rent
            && self.status == Some(PropertyStatus::Sold)
        {
            return Err("A rental property cannot be marked as sold".into());
        }

        Ok(())
    }

    pub fn into_property(self) -> Property {
        let now = Utc::now();
        Property {
            id: Uuid::new_v4(),
            slug: slugify(&self.title),
            title: self.title,
            description: self.description,
            price: self.price,
            property_type: self.property_type,
            listing_type: self.listing_type,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            square_feet: self.square_feet,
            parish_id: self.parish_id,
            address: self.address,
            latitude: self.latitude,
            longitude: self.longitude,
            image_urls: self.image_urls,
            status: self.status.unwrap_or(PropertyStatus::Available),
            is_featured: self.is_featured,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_to_existing(self, existing: &mut Property) {
        existing.title = self.title;
        existing.description = self.description;
        existing.price = self.price;
        existing.property_type = self.property_type;
        existing.listing_type = self.listing_type;
        existing.bedrooms = self.bedrooms;
        existing.bathrooms = self.bathrooms;
        existing.square_feet = self.square_feet;
        existing.parish_id = self.parish_id;
        existing.address = self.address;
        existing.latitude = self.latitude;
        existing.longitude = self.longitude;
        existing.image_urls = self.image_urls;
        if let Some(status) = self.status {
            existing.status = status;
        }
        existing.is_featured = self.is_featured;
        existing.updated_at = Utc::now();
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInquiryRequest {
    #[validate(length(min = 2, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(length(min = 10, max = 4000))]
    pub message: String,
}

impl CreateInquiryRequest {
    pub fn into_inquiry(self, property_id: Uuid) -> PropertyInquiry {
        PropertyInquiry {
            id: Uuid::new_v4(),
            property_id,
            name: self.name.trim().to_string(),
            email: self.email,
            phone: self.phone,
            message: self.message,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: i32) -> Review {
        Review {
            id: Uuid::new_v4(),
            listing_id: Uuid::new_v4(),
            user_id: None,
            reviewer_name: "Guest".into(),
            reviewer_email: None,
            rating,
            comment: "Lovely spot by the water".into(),
            status: ReviewStatus::Approved,
            created_at: Utc::now(),
        }
    }

    fn listing_request(name: &str) -> CreateListingRequest {
        CreateListingRequest {
            business_name: name.into(),
            category_id: Uuid::new_v4(),
            parish_id: Uuid::new_v4(),
            short_description: None,
            description: None,
            phone: None,
            email: Some("owner@example.com".into()),
            website: Some("https://example.com".into()),
            address: None,
            latitude: None,
            longitude: None,
            facebook_url: None,
            instagram_url: None,
            google_business_url: None,
            tripadvisor_url: None,
            twitter_url: None,
        }
    }

    #[test]
    fn page_window_clamps_and_offsets() {
        assert_eq!(page_window(None, None), (1, 12, 0));
        assert_eq!(page_window(Some(3), Some(10)), (3, 10, 20));
        assert_eq!(page_window(Some(0), Some(1000)), (1, 100, 0));
        assert_eq!(page_window(Some(-4), Some(0)), (1, 1, 0));
    }

    #[test]
    fn renaming_a_listing_moves_its_slug() {
        let mut listing = listing_request("Shirley Heights Lookout")
            .into_new_listing()
            .into_listing();
        let update = UpdateListingRequest {
            business_name: "Shirley Heights Lookout & Grill".into(),
            category_id: listing.category_id,
            parish_id: listing.parish_id,
            short_description: None,
            description: None,
            phone: None,
            email: None,
            website: None,
            address: None,
            latitude: Some(17.0),
            longitude: None,
            facebook_url: None,
            instagram_url: None,
            google_business_url: None,
            tripadvisor_url: None,
            twitter_url: None,
            status: ListingStatus::Active,
            is_featured: true,
        };
        assert!(update.validate_business_rules().is_err());

        update.apply_to_existing(&mut listing);
        assert_eq!(listing.slug, "shirley-heights-lookout-grill");
        assert_eq!(listing.business_name, "Shirley Heights Lookout & Grill");
        assert_eq!(listing.status, ListingStatus::Active);
    }

    #[test]
    fn page_window_saturates_huge_pages() {
        let (page, per_page, offset) = page_window(Some(i64::MAX), Some(100));
        assert_eq!(page, i64::MAX);
        assert_eq!(per_page, 100);
        assert_eq!(offset, i64::MAX);
    }

    #[test]
    fn page_counts_partial_last_page() {
        let page = Page::new(vec![1, 2], 25, 1, 12);
        assert_eq!(page.total_pages, 3);
        let empty: Page<i32> = Page::new(vec![], 0, 1, 12);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn listing_detail_averages_ratings() {
        let listing = listing_request("Shirley Heights Lookout").into_new_listing().into_listing();
        let detail = ListingDetail::new(listing, None, None, vec![review(5), review(4)]);
        assert_eq!(detail.review_count, 2);
        assert_eq!(detail.average_rating, Some(4.5));
    }

    #[test]
    fn listing_detail_without_reviews_has_no_average() {
        let listing = listing_request("Nelson's Dockyard").into_new_listing().into_listing();
        let detail = ListingDetail::new(listing, None, None, vec![]);
        assert_eq!(detail.average_rating, None);
    }

    #[test]
    fn submitted_listing_is_pending_with_derived_slug() {
        let listing = listing_request("  Catherine's Cafe ").into_new_listing();
        assert_eq!(listing.status, ListingStatus::Pending);
        assert_eq!(listing.slug, "catherine-s-cafe");
        assert_eq!(listing.business_name, "Catherine's Cafe");
    }

    #[test]
    fn half_a_coordinate_is_rejected() {
        let mut request = listing_request("Jolly Harbour Marina");
        request.latitude = Some(17.07);
        assert!(request.validate_business_rules().is_err());
        request.longitude = Some(-61.88);
        assert!(request.validate_business_rules().is_ok());
    }

    #[test]
    fn punctuation_only_name_is_rejected() {
        let request = listing_request("!!!");
        assert!(request.validate_business_rules().is_err());
    }

    #[test]
    fn review_rating_out_of_range_fails_validation() {
        let request = CreateReviewRequest {
            reviewer_name: "Ann".into(),
            reviewer_email: None,
            rating: 6,
            comment: "Great snorkelling trip".into(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn moderation_back_to_pending_is_rejected() {
        let pending = ModerateReviewRequest {
            status: ReviewStatus::Pending,
        };
        assert!(pending.validate_business_rules().is_err());
        let approved = ModerateReviewRequest {
            status: ReviewStatus::Approved,
        };
        assert!(approved.validate_business_rules().is_ok());
    }

    #[test]
    fn land_with_bedrooms_is_rejected() {
        let request = PropertyRequest {
            title: "Half acre lot in Jolly Hill".into(),
            description: None,
            price: 85_000,
            property_type: PropertyType::Land,
            listing_type: PropertyListingType::Sale,
            bedrooms: Some(2),
            bathrooms: None,
            square_feet: None,
            parish_id: None,
            address: None,
            latitude: None,
            longitude: None,
            image_urls: vec![],
            status: None,
            is_featured: false,
        };
        assert!(request.validate_business_rules().is_err());
    }

    #[test]
    fn new_property_defaults_to_available() {
        let request = PropertyRequest {
            title: "Two bed villa, English Harbour".into(),
            description: None,
            price: 450_000,
            property_type: PropertyType::Villa,
            listing_type: PropertyListingType::Sale,
            bedrooms: Some(2),
            bathrooms: Some(2),
            square_feet: Some(1400),
            parish_id: None,
            address: None,
            latitude: None,
            longitude: None,
            image_urls: vec![],
            status: None,
            is_featured: true,
        };
        let property = request.into_property();
        assert_eq!(property.status, PropertyStatus::Available);
        assert_eq!(property.slug, "two-bed-villa-english-harbour");
    }

    #[test]
    fn closed_property_statuses() {
        assert!(PropertyStatus::Sold.is_closed());
        assert!(PropertyStatus::Rented.is_closed());
        assert!(!PropertyStatus::UnderContract.is_closed());
    }
}
