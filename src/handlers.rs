use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::analytics::{self, TimeRange};
use crate::clients::email::EmailClient;
use crate::database::{is_unique_violation, Database};
use crate::import;
use crate::models::{
    page_window, ApiResponse, CreateInquiryRequest, CreateListingRequest, CreateReviewRequest,
    ListingDetail, ListingFilter, ListingStatus, ModerateReviewRequest, Page, PropertyFilter,
    PropertyRequest, ReviewStatus, TrackClickRequest, TrackPageviewRequest, TrackSearchRequest,
    UpdateListingRequest, UpdateListingStatusRequest,
};

fn extract_actor_id(req: &HttpRequest) -> Result<Uuid, String> {
    req.headers()
        .get("X-Actor-Id")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| "Missing or invalid X-Actor-Id header".to_string())
}

fn extract_actor_headers(req: &HttpRequest) -> Result<(Uuid, String), String> {
    let actor_id = extract_actor_id(req)?;

    let actor_name = req
        .headers()
        .get("X-Actor-Name")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .ok_or_else(|| "Missing X-Actor-Name header".to_string())?;

    Ok((actor_id, actor_name))
}

// ============================================================================
// HEALTH CHECK
// ============================================================================

#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "antigua-directory-service",
        "timestamp": chrono::Utc::now()
    }))
}

// ============================================================================
// LOOKUPS
// ============================================================================

#[get("/categories")]
pub async fn list_categories(db: web::Data<Database>) -> impl Responder {
    match db.list_categories().await {
        Ok(categories) => HttpResponse::Ok().json(ApiResponse::success(categories)),
        Err(err) => {
            log::error!("Failed to list categories: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list categories".into()))
        }
    }
}

#[get("/parishes")]
pub async fn list_parishes(db: web::Data<Database>) -> impl Responder {
    match db.list_parishes().await {
        Ok(parishes) => HttpResponse::Ok().json(ApiResponse::success(parishes)),
        Err(err) => {
            log::error!("Failed to list parishes: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list parishes".into()))
        }
    }
}

// ============================================================================
// LISTINGS (public directory)
// ============================================================================

#[get("/listings")]
pub async fn list_listings(
    db: web::Data<Database>,
    query: web::Query<ListingFilter>,
) -> impl Responder {
    let filter = query.into_inner();
    let (page, per_page, offset) = page_window(filter.page, filter.per_page);

    match db.search_listings(&filter, per_page, offset).await {
        Ok((listings, total)) => {
            HttpResponse::Ok().json(ApiResponse::success(Page::new(listings, total, page, per_page)))
        }
        Err(err) => {
            log::error!("Failed to search listings: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to search listings".into()))
        }
    }
}

#[get("/listings/{slug}")]
pub async fn get_listing(db: web::Data<Database>, slug: web::Path<String>) -> impl Responder {
    let slug = slug.into_inner();

    let listing = match db.get_listing_by_slug(&slug).await {
        Ok(Some(listing)) if listing.status == ListingStatus::Active => listing,
        Ok(_) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("Listing not found".into()))
        }
        Err(err) => {
            log::error!("Failed to fetch listing: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to fetch listing".into()));
        }
    };

    let (category, parish, reviews) = futures_util::join!(
        db.get_category(listing.category_id),
        db.get_parish(listing.parish_id),
        db.list_approved_reviews(listing.id),
    );

    match (category, parish, reviews) {
        (Ok(category), Ok(parish), Ok(reviews)) => HttpResponse::Ok().json(ApiResponse::success(
            ListingDetail::new(listing, category, parish, reviews),
        )),
        (category, parish, reviews) => {
            log::error!(
                "Failed to load listing details: category={:?} parish={:?} reviews={:?}",
                category.err(),
                parish.err(),
                reviews.err()
            );
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load listing details".into()))
        }
    }
}

#[post("/listings")]
pub async fn submit_listing(
    db: web::Data<Database>,
    email: web::Data<EmailClient>,
    payload: web::Json<CreateListingRequest>,
) -> impl Responder {
    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    if let Err(message) = body.validate_business_rules() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(message));
    }

    let category = match db.get_category(body.category_id).await {
        Ok(Some(category)) => category,
        Ok(None) => {
            return HttpResponse::BadRequest()
                .json(ApiResponse::<()>::error("Category not found".into()))
        }
        Err(err) => {
            log::error!("Failed to fetch category: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to submit listing".into()));
        }
    };

    let parish = match db.get_parish(body.parish_id).await {
        Ok(Some(parish)) => parish,
        Ok(None) => {
            return HttpResponse::BadRequest()
                .json(ApiResponse::<()>::error("Parish not found".into()))
        }
        Err(err) => {
            log::error!("Failed to fetch parish: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to submit listing".into()));
        }
    };

    let listing = match db.create_listing(body.into_new_listing()).await {
        Ok(listing) => listing,
        Err(err) if is_unique_violation(&err) => {
            return HttpResponse::Conflict().json(ApiResponse::<()>::error(
                "A listing with this business name already exists".into(),
            ))
        }
        Err(err) => {
            log::error!("Failed to create listing: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to submit listing".into()));
        }
    };

    // Notification failures never fail the submission.
    if let Err(err) = email
        .notify_new_listing(&listing, Some(&category), Some(&parish))
        .await
    {
        log::error!("Failed to send new listing notification for {}: {err}", listing.id);
    }

    HttpResponse::Created().json(ApiResponse::success(listing))
}

// ============================================================================
// LISTINGS (admin)
// ============================================================================

#[derive(Deserialize)]
pub struct AdminListingQuery {
    pub status: Option<ListingStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[get("/admin/listings")]
pub async fn admin_list_listings(
    req: HttpRequest,
    db: web::Data<Database>,
    query: web::Query<AdminListingQuery>,
) -> impl Responder {
    if let Err(err) = extract_actor_headers(&req) {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err));
    }

    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    match db.list_listings_by_status(query.status, limit, offset).await {
        Ok(listings) => HttpResponse::Ok().json(ApiResponse::success(listings)),
        Err(err) => {
            log::error!("Failed to list listings: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list listings".into()))
        }
    }
}

#[put("/admin/listings/{listing_id}")]
pub async fn admin_update_listing(
    req: HttpRequest,
    db: web::Data<Database>,
    listing_id: web::Path<Uuid>,
    payload: web::Json<UpdateListingRequest>,
) -> impl Responder {
    let (_actor_id, actor_name) = match extract_actor_headers(&req) {
        Ok(headers) => headers,
        Err(err) => {
            return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err));
        }
    };

    let listing_id = listing_id.into_inner();
    let body = payload.into_inner();

    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    if let Err(message) = body.validate_business_rules() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(message));
    }

    let mut existing_listing = match db.get_listing(listing_id).await {
        Ok(Some(listing)) => listing,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("Listing not found".into()));
        }
        Err(err) => {
            log::error!("Failed to fetch listing: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load listing".into()));
        }
    };

    body.apply_to_existing(&mut existing_listing);

    match db.update_listing(existing_listing).await {
        Ok(updated) => {
            log::info!("Listing {} updated by {}", updated.id, actor_name);
            HttpResponse::Ok().json(ApiResponse::success(updated))
        }
        Err(err) if is_unique_violation(&err) => HttpResponse::Conflict().json(
            ApiResponse::<()>::error("A listing with this business name already exists".into()),
        ),
        Err(err) => {
            log::error!("Failed to update listing: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to update listing".into()))
        }
    }
}

#[put("/admin/listings/{listing_id}/status")]
pub async fn admin_set_listing_status(
    req: HttpRequest,
    db: web::Data<Database>,
    listing_id: web::Path<Uuid>,
    payload: web::Json<UpdateListingStatusRequest>,
) -> impl Responder {
    let (_actor_id, actor_name) = match extract_actor_headers(&req) {
        Ok(headers) => headers,
        Err(err) => {
            return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err));
        }
    };

    let listing_id = listing_id.into_inner();
    let status = payload.into_inner().status;

    match db.set_listing_status(listing_id, status).await {
        Ok(Some(listing)) => {
            log::info!("Listing {} set to {:?} by {}", listing.id, status, actor_name);
            HttpResponse::Ok().json(ApiResponse::success(listing))
        }
        Ok(None) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Listing not found".into()))
        }
        Err(err) => {
            log::error!("Failed to update listing status: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to update listing status".into()))
        }
    }
}

#[delete("/admin/listings/{listing_id}")]
pub async fn admin_delete_listing(
    req: HttpRequest,
    db: web::Data<Database>,
    listing_id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(err) = extract_actor_headers(&req) {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err));
    }

    let listing_id = listing_id.into_inner();
    match db.delete_listing(listing_id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(sqlx::Error::RowNotFound) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Listing not found".into()))
        }
        Err(err) => {
            log::error!("Failed to delete listing: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to delete listing".into()))
        }
    }
}

// ============================================================================
// CLAIMS
// ============================================================================

#[post("/listings/{listing_id}/claim")]
pub async fn claim_listing(
    req: HttpRequest,
    db: web::Data<Database>,
    listing_id: web::Path<Uuid>,
) -> impl Responder {
    let actor_id = match extract_actor_id(&req) {
        Ok(id) => id,
        Err(err) => return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err)),
    };

    let listing_id = listing_id.into_inner();
    match db.get_listing(listing_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("Listing not found".into()))
        }
        Err(err) => {
            log::error!("Failed to fetch listing: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to claim listing".into()));
        }
    }

    match db.create_claim(listing_id, actor_id).await {
        Ok(claim) => HttpResponse::Created().json(ApiResponse::success(claim)),
        Err(err) if is_unique_violation(&err) => HttpResponse::Conflict()
            .json(ApiResponse::<()>::error("Listing already claimed by this user".into())),
        Err(err) => {
            log::error!("Failed to claim listing: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to claim listing".into()))
        }
    }
}

#[delete("/listings/{listing_id}/claim")]
pub async fn unclaim_listing(
    req: HttpRequest,
    db: web::Data<Database>,
    listing_id: web::Path<Uuid>,
) -> impl Responder {
    let actor_id = match extract_actor_id(&req) {
        Ok(id) => id,
        Err(err) => return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err)),
    };

    match db.delete_claim(listing_id.into_inner(), actor_id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(sqlx::Error::RowNotFound) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Claim not found".into()))
        }
        Err(err) => {
            log::error!("Failed to remove claim: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to remove claim".into()))
        }
    }
}

#[get("/users/{user_id}/claims")]
pub async fn list_claims_for_user(
    db: web::Data<Database>,
    user_id: web::Path<Uuid>,
) -> impl Responder {
    match db.list_claims_for_user(user_id.into_inner()).await {
        Ok(claims) => HttpResponse::Ok().json(ApiResponse::success(claims)),
        Err(err) => {
            log::error!("Failed to list claims: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list claims".into()))
        }
    }
}

#[put("/admin/claims/{claim_id}/verify")]
pub async fn verify_claim(
    req: HttpRequest,
    db: web::Data<Database>,
    claim_id: web::Path<Uuid>,
) -> impl Responder {
    let (_actor_id, actor_name) = match extract_actor_headers(&req) {
        Ok(headers) => headers,
        Err(err) => {
            return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err));
        }
    };

    match db.verify_claim(claim_id.into_inner()).await {
        Ok(Some(claim)) => {
            log::info!("Claim {} verified by {}", claim.id, actor_name);
            HttpResponse::Ok().json(ApiResponse::success(claim))
        }
        Ok(None) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Claim not found".into()))
        }
        Err(err) => {
            log::error!("Failed to verify claim: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to verify claim".into()))
        }
    }
}

// ============================================================================
// REVIEWS
// ============================================================================

#[post("/listings/{listing_id}/reviews")]
pub async fn submit_review(
    req: HttpRequest,
    db: web::Data<Database>,
    listing_id: web::Path<Uuid>,
    payload: web::Json<CreateReviewRequest>,
) -> impl Responder {
    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    let listing_id = listing_id.into_inner();
    match db.get_listing(listing_id).await {
        Ok(Some(listing)) if listing.status == ListingStatus::Active => {}
        Ok(_) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("Listing not found".into()))
        }
        Err(err) => {
            log::error!("Failed to fetch listing: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to submit review".into()));
        }
    }

    // Anonymous reviews are allowed; the actor header is optional here.
    let user_id = extract_actor_id(&req).ok();

    match db.create_review(body.into_new_review(listing_id, user_id)).await {
        Ok(review) => HttpResponse::Created().json(ApiResponse::success(review)),
        Err(err) => {
            log::error!("Failed to create review: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to submit review".into()))
        }
    }
}

#[derive(Deserialize)]
pub struct ReviewQueueQuery {
    pub status: Option<ReviewStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[get("/admin/reviews")]
pub async fn admin_list_reviews(
    req: HttpRequest,
    db: web::Data<Database>,
    query: web::Query<ReviewQueueQuery>,
) -> impl Responder {
    if let Err(err) = extract_actor_headers(&req) {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err));
    }

    let status = query.status.unwrap_or(ReviewStatus::Pending);
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    match db.list_reviews_by_status(status, limit, offset).await {
        Ok(reviews) => HttpResponse::Ok().json(ApiResponse::success(reviews)),
        Err(err) => {
            log::error!("Failed to list reviews: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list reviews".into()))
        }
    }
}

#[put("/admin/reviews/{review_id}/moderate")]
pub async fn moderate_review(
    req: HttpRequest,
    db: web::Data<Database>,
    review_id: web::Path<Uuid>,
    payload: web::Json<ModerateReviewRequest>,
) -> impl Responder {
    let (_actor_id, actor_name) = match extract_actor_headers(&req) {
        Ok(headers) => headers,
        Err(err) => {
            return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err));
        }
    };

    let body = payload.into_inner();
    if let Err(message) = body.validate_business_rules() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(message));
    }

    match db.moderate_review(review_id.into_inner(), body.status).await {
        Ok(Some(review)) => {
            log::info!("Review {} marked {:?} by {}", review.id, review.status, actor_name);
            HttpResponse::Ok().json(ApiResponse::success(review))
        }
        Ok(None) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Review not found".into()))
        }
        Err(err) => {
            log::error!("Failed to moderate review: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to moderate review".into()))
        }
    }
}

#[delete("/admin/reviews/{review_id}")]
pub async fn delete_review(
    req: HttpRequest,
    db: web::Data<Database>,
    review_id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(err) = extract_actor_headers(&req) {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err));
    }

    match db.delete_review(review_id.into_inner()).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(sqlx::Error::RowNotFound) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Review not found".into()))
        }
        Err(err) => {
            log::error!("Failed to delete review: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to delete review".into()))
        }
    }
}

// ============================================================================
// ANALYTICS
// ============================================================================

#[post("/analytics/pageview")]
pub async fn track_pageview(
    db: web::Data<Database>,
    payload: web::Json<TrackPageviewRequest>,
) -> impl Responder {
    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    match db
        .insert_pageview(
            body.listing_id,
            &body.page_path,
            body.referrer.as_deref(),
            body.session_id.as_deref(),
        )
        .await
    {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => {
            log::error!("Failed to record pageview: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to record pageview".into()))
        }
    }
}

#[post("/analytics/search")]
pub async fn track_search(
    db: web::Data<Database>,
    payload: web::Json<TrackSearchRequest>,
) -> impl Responder {
    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    match db
        .insert_search(
            body.search_query.trim(),
            body.category_id,
            body.parish_id,
            body.results_count,
        )
        .await
    {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => {
            log::error!("Failed to record search: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to record search".into()))
        }
    }
}

#[post("/analytics/click")]
pub async fn track_click(
    db: web::Data<Database>,
    payload: web::Json<TrackClickRequest>,
) -> impl Responder {
    let body = payload.into_inner();
    match db.insert_click(body.listing_id, body.click_type).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => {
            log::error!("Failed to record click: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to record click".into()))
        }
    }
}

#[derive(Deserialize)]
pub struct AnalyticsQuery {
    pub range: Option<String>,
}

#[get("/admin/analytics")]
pub async fn analytics_dashboard(
    req: HttpRequest,
    db: web::Data<Database>,
    query: web::Query<AnalyticsQuery>,
) -> impl Responder {
    if let Err(err) = extract_actor_headers(&req) {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err));
    }

    let range = match query.range.as_deref().map(str::parse::<TimeRange>) {
        None => TimeRange::default(),
        Some(Ok(range)) => range,
        Some(Err(message)) => {
            return HttpResponse::BadRequest().json(ApiResponse::<()>::error(message));
        }
    };

    let report = analytics::build_report(db.get_ref(), range, chrono::Utc::now()).await;
    HttpResponse::Ok().json(ApiResponse::success(report))
}

// ============================================================================
// BULK IMPORT
// ============================================================================

#[post("/admin/import")]
pub async fn import_listings(
    req: HttpRequest,
    db: web::Data<Database>,
    body: web::Bytes,
) -> impl Responder {
    let (_actor_id, actor_name) = match extract_actor_headers(&req) {
        Ok(headers) => headers,
        Err(err) => {
            return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err));
        }
    };

    log::info!("{} started a listing import ({} bytes)", actor_name, body.len());

    match import::import_csv(db.get_ref(), &body).await {
        Ok(summary) => HttpResponse::Ok().json(ApiResponse::success(summary)),
        Err(err @ import::ImportFileError::Parse(_)) => {
            HttpResponse::BadRequest().json(ApiResponse::<()>::error(err.to_string()))
        }
        Err(err) => {
            log::error!("Listing import failed: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load categories and parishes".into()))
        }
    }
}

#[get("/admin/import/template")]
pub async fn import_template() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            "Content-Disposition",
            "attachment; filename=\"listings-template.csv\"",
        ))
        .body(format!("{}\n", import::CSV_HEADERS.join(",")))
}

// ============================================================================
// PROPERTIES (real-estate site)
// ============================================================================

#[get("/properties")]
pub async fn list_properties(
    db: web::Data<Database>,
    query: web::Query<PropertyFilter>,
) -> impl Responder {
    let filter = query.into_inner();
    let (page, per_page, offset) = page_window(filter.page, filter.per_page);

    match db.search_properties(&filter, per_page, offset).await {
        Ok((properties, total)) => HttpResponse::Ok()
            .json(ApiResponse::success(Page::new(properties, total, page, per_page))),
        Err(err) => {
            log::error!("Failed to search properties: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to search properties".into()))
        }
    }
}

#[get("/properties/{slug}")]
pub async fn get_property(db: web::Data<Database>, slug: web::Path<String>) -> impl Responder {
    match db.get_property_by_slug(&slug.into_inner()).await {
        Ok(Some(property)) => HttpResponse::Ok().json(ApiResponse::success(property)),
        Ok(None) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Property not found".into()))
        }
        Err(err) => {
            log::error!("Failed to get property: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to get property".into()))
        }
    }
}

#[post("/admin/properties")]
pub async fn create_property(
    req: HttpRequest,
    db: web::Data<Database>,
    payload: web::Json<PropertyRequest>,
) -> impl Responder {
    if let Err(err) = extract_actor_headers(&req) {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err));
    }

    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    if let Err(message) = body.validate_business_rules() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(message));
    }

    match db.create_property(body.into_property()).await {
        Ok(property) => HttpResponse::Created().json(ApiResponse::success(property)),
        Err(err) if is_unique_violation(&err) => HttpResponse::Conflict().json(
            ApiResponse::<()>::error("A property with this title already exists".into()),
        ),
        Err(err) => {
            log::error!("Failed to create property: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to create property".into()))
        }
    }
}

#[put("/admin/properties/{property_id}")]
pub async fn update_property(
    req: HttpRequest,
    db: web::Data<Database>,
    property_id: web::Path<Uuid>,
    payload: web::Json<PropertyRequest>,
) -> impl Responder {
    if let Err(err) = extract_actor_headers(&req) {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err));
    }

    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    if let Err(message) = body.validate_business_rules() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(message));
    }

    let mut existing_property = match db.get_property(property_id.into_inner()).await {
        Ok(Some(property)) => property,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("Property not found".into()));
        }
        Err(err) => {
            log::error!("Failed to fetch property: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load property".into()));
        }
    };

    body.apply_to_existing(&mut existing_property);

    match db.update_property(existing_property).await {
        Ok(updated) => HttpResponse::Ok().json(ApiResponse::success(updated)),
        Err(err) => {
            log::error!("Failed to update property: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to update property".into()))
        }
    }
}

#[delete("/admin/properties/{property_id}")]
pub async fn delete_property(
    req: HttpRequest,
    db: web::Data<Database>,
    property_id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(err) = extract_actor_headers(&req) {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err));
    }

    match db.delete_property(property_id.into_inner()).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(sqlx::Error::RowNotFound) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Property not found".into()))
        }
        Err(err) => {
            log::error!("Failed to delete property: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to delete property".into()))
        }
    }
}

#[post("/properties/{property_id}/inquiries")]
pub async fn create_inquiry(
    db: web::Data<Database>,
    property_id: web::Path<Uuid>,
    payload: web::Json<CreateInquiryRequest>,
) -> impl Responder {
    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    let property_id = property_id.into_inner();
    match db.get_property(property_id).await {
        Ok(Some(property)) if property.status.is_closed() => {
            return HttpResponse::BadRequest()
                .json(ApiResponse::<()>::error("Property is no longer available".into()))
        }
        Ok(Some(_)) => {}
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("Property not found".into()))
        }
        Err(err) => {
            log::error!("Failed to fetch property: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to send inquiry".into()));
        }
    }

    match db.create_inquiry(body.into_inquiry(property_id)).await {
        Ok(inquiry) => HttpResponse::Created().json(ApiResponse::success(inquiry)),
        Err(err) => {
            log::error!("Failed to create inquiry: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to send inquiry".into()))
        }
    }
}

#[get("/admin/properties/{property_id}/inquiries")]
pub async fn list_inquiries(
    req: HttpRequest,
    db: web::Data<Database>,
    property_id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(err) = extract_actor_headers(&req) {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(err));
    }

    match db.list_inquiries_for_property(property_id.into_inner()).await {
        Ok(inquiries) => HttpResponse::Ok().json(ApiResponse::success(inquiries)),
        Err(err) => {
            log::error!("Failed to list inquiries: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list inquiries".into()))
        }
    }
}
