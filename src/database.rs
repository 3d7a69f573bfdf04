use std::{borrow::Cow, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    Connection, Executor, PgPool,
};
use uuid::Uuid;

use crate::import::ListingSink;
use crate::models::{
    Category, ClaimedListing, ClickEvent, Listing, ListingFilter, ListingLabel, ListingStatus,
    NewListing, NewReview, PageviewEvent, Parish, Property, PropertyFilter, PropertyInquiry,
    Review, ReviewStatus, SearchEvent,
};

/// Postgres SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code() == Some(Cow::Borrowed(UNIQUE_VIOLATION)))
}

/// Escapes LIKE wildcards and wraps the term for a substring match.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = match pool_options().connect(database_url).await {
            Ok(pool) => pool,
            Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("3D000")) => {
                log::info!("Database missing, attempting to create it");
                create_database_if_missing(database_url).await?;
                pool_options().connect(database_url).await?
            }
            Err(err) => return Err(err),
        };

        // Run embedded migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        log::info!("Database connection established");
        Ok(Self { pool })
    }

    /// Builds a pool that only connects on first use and skips migrations.
    #[cfg(test)]
    pub fn connect_lazy(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }

    // ========================================================================
    // LOOKUPS
    // ========================================================================

    pub async fn list_categories(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn list_parishes(&self) -> Result<Vec<Parish>, sqlx::Error> {
        sqlx::query_as::<_, Parish>("SELECT * FROM parishes ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_category(&self, category_id: Uuid) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_parish(&self, parish_id: Uuid) -> Result<Option<Parish>, sqlx::Error> {
        sqlx::query_as::<_, Parish>("SELECT * FROM parishes WHERE id = $1")
            .bind(parish_id)
            .fetch_optional(&self.pool)
            .await
    }

    // ========================================================================
    // LISTINGS
    // ========================================================================

    /// Active listings matching the directory filters, plus the unpaged total.
    pub async fn search_listings(
        &self,
        filter: &ListingFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Listing>, i64), sqlx::Error> {
        let category = non_empty(&filter.category);
        let parish = non_empty(&filter.parish);
        let pattern = non_empty(&filter.q).map(|q| like_pattern(&q));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM listings l
            JOIN categories c ON c.id = l.category_id
            JOIN parishes p ON p.id = l.parish_id
            WHERE l.status = 'active'
              AND ($1::text IS NULL OR c.slug = $1)
              AND ($2::text IS NULL OR p.slug = $2)
              AND ($3::text IS NULL OR l.business_name ILIKE $3 OR l.short_description ILIKE $3)
              AND ($4::boolean IS NULL OR l.is_featured = $4)
            "#,
        )
        .bind(&category)
        .bind(&parish)
        .bind(&pattern)
        .bind(filter.featured)
        .fetch_one(&self.pool)
        .await?;

        let records = sqlx::query_as::<_, Listing>(
            r#"
            SELECT l.*
            FROM listings l
            JOIN categories c ON c.id = l.category_id
            JOIN parishes p ON p.id = l.parish_id
            WHERE l.status = 'active'
              AND ($1::text IS NULL OR c.slug = $1)
              AND ($2::text IS NULL OR p.slug = $2)
              AND ($3::text IS NULL OR l.business_name ILIKE $3 OR l.short_description ILIKE $3)
              AND ($4::boolean IS NULL OR l.is_featured = $4)
            ORDER BY l.is_featured DESC, l.business_name ASC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(&category)
        .bind(&parish)
        .bind(&pattern)
        .bind(filter.featured)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((records, total))
    }

    pub async fn list_listings_by_status(
        &self,
        status: Option<ListingStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Listing>, sqlx::Error> {
        sqlx::query_as::<_, Listing>(
            r#"
            SELECT * FROM listings
            WHERE ($1::listing_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_listing(&self, listing_id: Uuid) -> Result<Option<Listing>, sqlx::Error> {
        sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = $1")
            .bind(listing_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_listing_by_slug(&self, slug: &str) -> Result<Option<Listing>, sqlx::Error> {
        sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn create_listing(&self, listing: NewListing) -> Result<Listing, sqlx::Error> {
        let NewListing {
            id,
            business_name,
            slug,
            category_id,
            parish_id,
            short_description,
            description,
            phone,
            email,
            website,
            address,
            latitude,
            longitude,
            facebook_url,
            instagram_url,
            google_business_url,
            tripadvisor_url,
            twitter_url,
            status,
            is_featured,
            created_at,
            updated_at,
        } = listing;

        sqlx::query_as::<_, Listing>(
            r#"
            INSERT INTO listings (
                id,
                business_name,
                slug,
                category_id,
                parish_id,
                short_description,
                description,
                phone,
                email,
                website,
                address,
                latitude,
                longitude,
                facebook_url,
                instagram_url,
                google_business_url,
                tripadvisor_url,
                twitter_url,
                status,
                is_featured,
                created_at,
                updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                $21, $22
            )
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(business_name)
        .bind(slug)
        .bind(category_id)
        .bind(parish_id)
        .bind(short_description)
        .bind(description)
        .bind(phone)
        .bind(email)
        .bind(website)
        .bind(address)
        .bind(latitude)
        .bind(longitude)
        .bind(facebook_url)
        .bind(instagram_url)
        .bind(google_business_url)
        .bind(tripadvisor_url)
        .bind(twitter_url)
        .bind(status)
        .bind(is_featured)
        .bind(created_at)
        .bind(updated_at)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn update_listing(&self, listing: Listing) -> Result<Listing, sqlx::Error> {
        sqlx::query_as::<_, Listing>(
            r#"
            UPDATE listings
            SET business_name = $2,
                category_id = $3,
                parish_id = $4,
                short_description = $5,
                description = $6,
                phone = $7,
                email = $8,
                website = $9,
                address = $10,
                latitude = $11,
                longitude = $12,
                facebook_url = $13,
                instagram_url = $14,
                google_business_url = $15,
                tripadvisor_url = $16,
                twitter_url = $17,
                status = $18,
                is_featured = $19,
                slug = $20,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(listing.id)
        .bind(listing.business_name)
        .bind(listing.category_id)
        .bind(listing.parish_id)
        .bind(listing.short_description)
        .bind(listing.description)
        .bind(listing.phone)
        .bind(listing.email)
        .bind(listing.website)
        .bind(listing.address)
        .bind(listing.latitude)
        .bind(listing.longitude)
        .bind(listing.facebook_url)
        .bind(listing.instagram_url)
        .bind(listing.google_business_url)
        .bind(listing.tripadvisor_url)
        .bind(listing.twitter_url)
        .bind(listing.status)
        .bind(listing.is_featured)
        .bind(listing.slug)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn set_listing_status(
        &self,
        listing_id: Uuid,
        status: ListingStatus,
    ) -> Result<Option<Listing>, sqlx::Error> {
        sqlx::query_as::<_, Listing>(
            r#"
            UPDATE listings
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(listing_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete_listing(&self, listing_id: Uuid) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(listing_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    pub async fn list_listing_labels(&self) -> Result<Vec<ListingLabel>, sqlx::Error> {
        sqlx::query_as::<_, ListingLabel>(
            "SELECT id, business_name, category_id, parish_id, status FROM listings",
        )
        .fetch_all(&self.pool)
        .await
    }

    // ========================================================================
    // CLAIMS
    // ========================================================================

    pub async fn create_claim(
        &self,
        listing_id: Uuid,
        user_id: Uuid,
    ) -> Result<ClaimedListing, sqlx::Error> {
        sqlx::query_as::<_, ClaimedListing>(
            r#"
            INSERT INTO claimed_listings (id, listing_id, user_id, verified, created_at)
            VALUES ($1, $2, $3, FALSE, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(listing_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete_claim(&self, listing_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM claimed_listings WHERE listing_id = $1 AND user_id = $2")
                .bind(listing_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    pub async fn list_claims_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ClaimedListing>, sqlx::Error> {
        sqlx::query_as::<_, ClaimedListing>(
            "SELECT * FROM claimed_listings WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn verify_claim(&self, claim_id: Uuid) -> Result<Option<ClaimedListing>, sqlx::Error> {
        sqlx::query_as::<_, ClaimedListing>(
            "UPDATE claimed_listings SET verified = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(claim_id)
        .fetch_optional(&self.pool)
        .await
    }

    // ========================================================================
    // REVIEWS
    // ========================================================================

    pub async fn create_review(&self, review: NewReview) -> Result<Review, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (
                id, listing_id, user_id, reviewer_name, reviewer_email,
                rating, comment, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(review.id)
        .bind(review.listing_id)
        .bind(review.user_id)
        .bind(review.reviewer_name)
        .bind(review.reviewer_email)
        .bind(review.rating)
        .bind(review.comment)
        .bind(review.status)
        .bind(review.created_at)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_approved_reviews(&self, listing_id: Uuid) -> Result<Vec<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            r#"
            SELECT * FROM reviews
            WHERE listing_id = $1 AND status = 'approved'
            ORDER BY created_at DESC
            "#,
        )
        .bind(listing_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_reviews_by_status(
        &self,
        status: ReviewStatus,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            r#"
            SELECT * FROM reviews
            WHERE status = $1
            ORDER BY created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn moderate_review(
        &self,
        review_id: Uuid,
        status: ReviewStatus,
    ) -> Result<Option<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>("UPDATE reviews SET status = $2 WHERE id = $1 RETURNING *")
            .bind(review_id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn delete_review(&self, review_id: Uuid) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    // ========================================================================
    // ANALYTICS EVENTS
    // ========================================================================

    pub async fn insert_pageview(
        &self,
        listing_id: Option<Uuid>,
        page_path: &str,
        referrer: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO analytics_pageviews (id, listing_id, page_path, referrer, session_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(listing_id)
        .bind(page_path)
        .bind(referrer)
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_search(
        &self,
        search_query: &str,
        category_id: Option<Uuid>,
        parish_id: Option<Uuid>,
        results_count: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO analytics_searches (id, search_query, category_id, parish_id, results_count)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(search_query)
        .bind(category_id)
        .bind(parish_id)
        .bind(results_count)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_click(
        &self,
        listing_id: Uuid,
        click_type: crate::models::ClickType,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO analytics_clicks (id, listing_id, click_type) VALUES ($1, $2, $3)",
        )
        .bind(Uuid::new_v4())
        .bind(listing_id)
        .bind(click_type)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn pageviews_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<PageviewEvent>, sqlx::Error> {
        sqlx::query_as::<_, PageviewEvent>(
            "SELECT * FROM analytics_pageviews WHERE created_at >= $1 ORDER BY created_at ASC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn searches_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SearchEvent>, sqlx::Error> {
        sqlx::query_as::<_, SearchEvent>(
            "SELECT * FROM analytics_searches WHERE created_at >= $1 ORDER BY created_at ASC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn clicks_since(&self, since: DateTime<Utc>) -> Result<Vec<ClickEvent>, sqlx::Error> {
        sqlx::query_as::<_, ClickEvent>(
            "SELECT * FROM analytics_clicks WHERE created_at >= $1 ORDER BY created_at ASC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
    }

    // ========================================================================
    // PROPERTIES
    // ========================================================================

    pub async fn search_properties(
        &self,
        filter: &PropertyFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Property>, i64), sqlx::Error> {
        let parish = non_empty(&filter.parish);
        let include_closed = filter.include_closed.unwrap_or(false);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM properties pr
            LEFT JOIN parishes p ON p.id = pr.parish_id
            WHERE ($1::property_listing_type IS NULL OR pr.listing_type = $1)
              AND ($2::property_type IS NULL OR pr.property_type = $2)
              AND ($3::text IS NULL OR p.slug = $3)
              AND ($4::bigint IS NULL OR pr.price >= $4)
              AND ($5::bigint IS NULL OR pr.price <= $5)
              AND ($6::int IS NULL OR pr.bedrooms >= $6)
              AND ($7::boolean OR pr.status NOT IN ('sold', 'rented'))
            "#,
        )
        .bind(filter.listing_type)
        .bind(filter.property_type)
        .bind(&parish)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.min_bedrooms)
        .bind(include_closed)
        .fetch_one(&self.pool)
        .await?;

        let records = sqlx::query_as::<_, Property>(
            r#"
            SELECT pr.*
            FROM properties pr
            LEFT JOIN parishes p ON p.id = pr.parish_id
            WHERE ($1::property_listing_type IS NULL OR pr.listing_type = $1)
              AND ($2::property_type IS NULL OR pr.property_type = $2)
              AND ($3::text IS NULL OR p.slug = $3)
              AND ($4::bigint IS NULL OR pr.price >= $4)
              AND ($5::bigint IS NULL OR pr.price <= $5)
              AND ($6::int IS NULL OR pr.bedrooms >= $6)
              AND ($7::boolean OR pr.status NOT IN ('sold', 'rented'))
            ORDER BY pr.is_featured DESC, pr.created_at DESC
            LIMIT $8 OFFSET $9
            "#,
        )
        .bind(filter.listing_type)
        .bind(filter.property_type)
        .bind(&parish)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.min_bedrooms)
        .bind(include_closed)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((records, total))
    }

    pub async fn get_property(&self, property_id: Uuid) -> Result<Option<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1")
            .bind(property_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_property_by_slug(&self, slug: &str) -> Result<Option<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn create_property(&self, property: Property) -> Result<Property, sqlx::Error> {
        sqlx::query_as::<_, Property>(
            r#"
            INSERT INTO properties (
                id, title, slug, description, price, property_type, listing_type,
                bedrooms, bathrooms, square_feet, parish_id, address, latitude,
                longitude, image_urls, status, is_featured, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19
            )
            RETURNING *
            "#,
        )
        .bind(property.id)
        .bind(property.title)
        .bind(property.slug)
        .bind(property.description)
        .bind(property.price)
        .bind(property.property_type)
        .bind(property.listing_type)
        .bind(property.bedrooms)
        .bind(property.bathrooms)
        .bind(property.square_feet)
        .bind(property.parish_id)
        .bind(property.address)
        .bind(property.latitude)
        .bind(property.longitude)
        .bind(property.image_urls)
        .bind(property.status)
        .bind(property.is_featured)
        .bind(property.created_at)
        .bind(property.updated_at)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn update_property(&self, property: Property) -> Result<Property, sqlx::Error> {
        sqlx::query_as::<_, Property>(
            r#"
            UPDATE properties
            SET title = $2, description = $3, price = $4, property_type = $5,
                listing_type = $6, bedrooms = $7, bathrooms = $8, square_feet = $9,
                parish_id = $10, address = $11, latitude = $12, longitude = $13,
                image_urls = $14, status = $15, is_featured = $16, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(property.id)
        .bind(property.title)
        .bind(property.description)
        .bind(property.price)
        .bind(property.property_type)
        .bind(property.listing_type)
        .bind(property.bedrooms)
        .bind(property.bathrooms)
        .bind(property.square_feet)
        .bind(property.parish_id)
        .bind(property.address)
        .bind(property.latitude)
        .bind(property.longitude)
        .bind(property.image_urls)
        .bind(property.status)
        .bind(property.is_featured)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete_property(&self, property_id: Uuid) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(property_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    pub async fn create_inquiry(
        &self,
        inquiry: PropertyInquiry,
    ) -> Result<PropertyInquiry, sqlx::Error> {
        sqlx::query_as::<_, PropertyInquiry>(
            r#"
            INSERT INTO property_inquiries (id, property_id, name, email, phone, message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(inquiry.id)
        .bind(inquiry.property_id)
        .bind(inquiry.name)
        .bind(inquiry.email)
        .bind(inquiry.phone)
        .bind(inquiry.message)
        .bind(inquiry.created_at)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_inquiries_for_property(
        &self,
        property_id: Uuid,
    ) -> Result<Vec<PropertyInquiry>, sqlx::Error> {
        sqlx::query_as::<_, PropertyInquiry>(
            "SELECT * FROM property_inquiries WHERE property_id = $1 ORDER BY created_at DESC",
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[async_trait]
impl ListingSink for Database {
    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, String> {
        self.create_listing(listing).await.map_err(|err| match err {
            sqlx::Error::Database(db_err) => db_err.message().to_string(),
            other => other.to_string(),
        })
    }
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Some(Duration::from_secs(600)))
        .test_before_acquire(true)
}

async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    let options: PgConnectOptions = database_url.parse()?;
    let database_name = options
        .get_database()
        .map(|name| name.to_string())
        .unwrap_or_else(|| "postgres".to_string());

    // Already on the maintenance database.
    if database_name.eq_ignore_ascii_case("postgres") {
        return Ok(());
    }

    let maintenance_options = options.clone().database("postgres");

    let mut connection = sqlx::postgres::PgConnection::connect_with(&maintenance_options).await?;

    let escaped_name = database_name.replace('"', "\"\"");
    let create_stmt = format!("CREATE DATABASE \"{}\"", escaped_name);

    match connection.execute(create_stmt.as_str()).await {
        Ok(_) => {
            log::info!("Created database '{}'", database_name);
            Ok(())
        }
        Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("42P04")) => {
            log::info!("Database '{}' already exists", database_name);
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("beach"), "%beach%");
        assert_eq!(like_pattern("100%_rum"), "%100\\%\\_rum%");
    }

    #[test]
    fn non_empty_trims_and_drops_blanks() {
        assert_eq!(non_empty(&Some("  st-johns ".into())), Some("st-johns".into()));
        assert_eq!(non_empty(&Some("   ".into())), None);
        assert_eq!(non_empty(&None), None);
    }

    #[test]
    fn row_not_found_is_not_a_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    fn table_definition<'a>(schema: &'a str, table: &str) -> &'a str {
        let header = format!("CREATE TABLE {table} (");
        let start = schema.find(&header).expect("table is defined");
        let rest = &schema[start..];
        &rest[..rest.find(");").expect("table definition is closed")]
    }

    #[test]
    fn lookup_names_are_unique_in_schema() {
        let schema = include_str!("../migrations/0001_init.sql");
        for table in ["categories", "parishes"] {
            let definition = table_definition(schema, table);
            assert!(
                definition.contains("name TEXT NOT NULL UNIQUE"),
                "{table}.name must be unique"
            );
            assert!(definition.contains("slug TEXT NOT NULL UNIQUE"));
        }
    }
}
