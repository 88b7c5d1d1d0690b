use anyhow::Result;
use tracing::info;

use sprout_api::auth::hash_password;
use sprout_db::models::{ListingRow, UserRow};
use sprout_db::{Database, now_ts};

/// Demo fixtures for a fresh database. Skipped whenever any user
/// already exists, so re-running is harmless.
pub fn create_sample_data(db: &Database) -> Result<()> {
    if db.has_users()? {
        info!("Sample data already exists, skipping creation");
        return Ok(());
    }

    info!("Creating sample data");

    let now = now_ts();
    let password = hash_password("password123")?;

    let flora = db.save_user(&UserRow {
        id: None,
        email: "flora@example.com".into(),
        username: "flora_gardener".into(),
        password: password.clone(),
        name: "Flora Jensen".into(),
        location: "Bergen".into(),
        bio: "Avid gardener with a focus on native plants and vegetables.".into(),
        profile_pic: String::new(),
        created_at: now.clone(),
        last_login_at: now.clone(),
    })?;

    let milo = db.save_user(&UserRow {
        id: None,
        email: "milo@example.com".into(),
        username: "milo_plants".into(),
        password,
        name: "Milo Berg".into(),
        location: "Oslo".into(),
        bio: "Succulent collector and indoor plant enthusiast.".into(),
        profile_pic: String::new(),
        created_at: now.clone(),
        last_login_at: now.clone(),
    })?;

    db.save_listing(&ListingRow {
        id: None,
        user_id: flora,
        title: "Monstera Deliciosa Cuttings".into(),
        description: "Healthy cuttings from my 3-year-old monstera. Well rooted and ready for potting.".into(),
        listing_type: "cutting".into(),
        plant_type: "indoor".into(),
        price: 15.0,
        trade_for: "Pothos varieties, philodendrons".into(),
        location: "Bergen".into(),
        images: vec!["https://images.unsplash.com/photo-1466781783364-36c955e42a7f".into()],
        created_at: now.clone(),
        updated_at: now.clone(),
        status: "available".into(),
    })?;

    db.save_listing(&ListingRow {
        id: None,
        user_id: flora,
        title: "Heirloom Tomato Seeds".into(),
        description: "Seeds from my prize-winning Cherokee Purple tomatoes. Great for warm climates.".into(),
        listing_type: "seed".into(),
        plant_type: "vegetable".into(),
        price: 5.0,
        trade_for: "Other heirloom seeds".into(),
        location: "Bergen".into(),
        images: vec![],
        created_at: now.clone(),
        updated_at: now.clone(),
        status: "available".into(),
    })?;

    db.save_listing(&ListingRow {
        id: None,
        user_id: milo,
        title: "Echeveria Collection".into(),
        description: "Assorted echeveria rosettes, three years of careful propagation.".into(),
        listing_type: "plant".into(),
        plant_type: "succulent".into(),
        price: 25.0,
        trade_for: "Rare haworthia".into(),
        location: "Oslo".into(),
        images: vec![],
        created_at: now.clone(),
        updated_at: now,
        status: "available".into(),
    })?;

    info!("Created demo users {} and {} with listings", flora, milo);
    Ok(())
}
