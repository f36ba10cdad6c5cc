//! Account commands: register, login, logout, profile view and update.

use dialoguer::Password;
use tracing::info;

use sokoni_core::{NewUser, ProfileUpdate, UserProfile};

use super::Context;

/// Create a new account and sign it in.
///
/// Prompts for a password (with confirmation) when none was given on the
/// command line.
///
/// # Errors
///
/// Returns an error if configuration fails to load, the prompt is
/// interrupted, or the backend rejects the registration.
pub async fn register(
    email: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    address: Option<String>,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    let session = ctx.session();

    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?,
    };

    let new_user = NewUser {
        first_name,
        last_name,
        email,
        password,
        phone,
        address,
    };

    let user = session.register(&new_user).await?;
    info!("Registered and signed in as {}", user.email);
    Ok(())
}

/// Sign in, prompting for the password when none was given.
///
/// # Errors
///
/// Returns an error if configuration fails to load, the prompt is
/// interrupted, or the credentials are rejected.
pub async fn login(
    email: &str,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    let session = ctx.session();

    let password = match password {
        Some(password) => password,
        None => Password::new().with_prompt("Password").interact()?,
    };

    let user = session.login(email, &password).await?;
    info!("Signed in as {}", user.email);
    Ok(())
}

/// Sign out and forget the stored token pair. The cart stays.
///
/// # Errors
///
/// Returns an error if configuration fails to load.
pub async fn logout() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    ctx.session().logout().await;
    info!("Signed out");
    Ok(())
}

/// Show the signed-in user's profile, restoring the session from stored
/// tokens first.
///
/// # Errors
///
/// Returns an error if configuration fails to load or no valid session
/// exists.
pub async fn me() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    let session = ctx.session();

    let user = session
        .initialize()
        .await
        .ok_or("Not signed in (run `sokoni account login` first)")?;

    print_profile(&user);
    Ok(())
}

/// Update profile fields of the signed-in user.
///
/// # Errors
///
/// Returns an error if configuration fails to load, no field was given, no
/// valid session exists, or the backend rejects the update.
pub async fn update(
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    address: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let update = ProfileUpdate {
        first_name,
        last_name,
        phone,
        address,
    };
    if update.is_empty() {
        return Err("Nothing to update: pass at least one field".into());
    }

    let ctx = Context::load()?;
    let session = ctx.session();

    session
        .initialize()
        .await
        .ok_or("Not signed in (run `sokoni account login` first)")?;

    let user = session.update_profile(&update).await?;
    info!("Profile updated");
    print_profile(&user);
    Ok(())
}

fn print_profile(user: &UserProfile) {
    info!("{}", user.full_name());
    info!("  Email: {}", user.email);
    if let Some(phone) = user.phone.as_deref() {
        info!("  Phone: {phone}");
    }
    if let Some(address) = user.address.as_deref() {
        info!("  Address: {address}");
    }
    if user.is_admin() {
        info!("  Role: admin");
    }
}
