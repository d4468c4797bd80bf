use crate::infra::{
    FederatedIdentity, InMemoryCreditLedger, InMemoryIdentityProvider, InMemoryListingStore,
    InMemoryUserDirectory,
};
use clap::Args;
use estate_link::error::AppError;
use estate_link::marketplace::credits::{CreditError, CreditService, PaymentMethod};
use estate_link::marketplace::identity::{IdentityService, NewRegistration, UserType};
use estate_link::marketplace::listings::ListingCatalog;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Credits purchased during the walkthrough
    #[arg(long, default_value_t = 10)]
    pub(crate) credits: i64,
    /// Skip the federated sign-in portion of the demo
    #[arg(long)]
    pub(crate) skip_federated: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        credits,
        skip_federated,
    } = args;

    let provider = Arc::new(InMemoryIdentityProvider::default());
    let directory = Arc::new(InMemoryUserDirectory::default());
    let ledger = Arc::new(InMemoryCreditLedger::default());
    let store = Arc::new(InMemoryListingStore::default());

    let identity = IdentityService::new(provider.clone(), directory.clone(), ledger.clone());
    let paywall = CreditService::new(provider.clone(), directory.clone(), ledger.clone());
    let catalog = ListingCatalog::new(store);

    println!("Property marketplace demo (in-memory stores)");

    println!("\nRegistration");
    let seller = identity
        .register(NewRegistration {
            email: "seller@example.com".to_string(),
            password: "listing-pass-1".to_string(),
            user_type: UserType::Seller,
            full_name: "Petra Horakova".to_string(),
            phone: Some("+420777123456".to_string()),
        })
        .await?;
    println!("- Seller registered: {} ({})", seller.full_name, seller.email);

    let agent = identity
        .register(NewRegistration {
            email: "agent@example.com".to_string(),
            password: "agent-pass-1".to_string(),
            user_type: UserType::Agent,
            full_name: "Jan Dvorak".to_string(),
            phone: None,
        })
        .await?;
    println!("- Agent registered: {} ({})", agent.full_name, agent.email);

    println!("\nListing");
    let rows = catalog
        .create(json!({
            "title": "Sunny 2+kk apartment, Vinohrady",
            "price": 8_500_000,
            "city": "Prague",
            "seller_id": seller.id,
            "seller_contact": "+420777123456",
        }))
        .await?;
    let property_id = first_listing_id(&rows);
    println!("- Property listed with id {property_id}");

    println!("\nAgent sign-in");
    let session = identity.login("agent@example.com", "agent-pass-1").await?;
    let token = session.access_token;
    println!("- Login successful for {}", session.user.email);

    println!("\nCredits");
    let account = paywall.balance(&token).await?;
    println!("- Opening balance: {} credits", account.balance);

    let receipt = paywall
        .purchase(&token, credits, PaymentMethod::Card)
        .await?;
    println!(
        "- Purchased {} credits for {} {} (payment {})",
        receipt.amount, receipt.total_price, receipt.currency, receipt.payment_id
    );

    println!("\nContact access");
    let grant = paywall.unlock_contact(&token, &property_id).await?;
    match (grant.credits_used, grant.credits_remaining) {
        (Some(used), Some(remaining)) => println!(
            "- Unlocked property {} for {} credits ({} remaining)",
            grant.property_id, used, remaining
        ),
        _ => println!("- Unlocked property {}", grant.property_id),
    }

    let repeat = paywall.unlock_contact(&token, &property_id).await?;
    if repeat.credits_used.is_none() {
        println!(
            "- Repeat unlock reused grant {} at no extra charge",
            repeat.access_id
        );
    }

    println!("\nSpending down");
    let mut unlocked = 1;
    loop {
        let rows = catalog
            .create(json!({
                "title": format!("Listing {}", unlocked + 1),
                "seller_id": seller.id,
            }))
            .await?;
        let next_id = first_listing_id(&rows);

        match paywall.unlock_contact(&token, &next_id).await {
            Ok(view) => {
                unlocked += 1;
                println!(
                    "- Unlocked property {} ({} credits remaining)",
                    next_id,
                    view.credits_remaining.unwrap_or_default()
                );
            }
            Err(CreditError::InsufficientCredits {
                required,
                available,
            }) => {
                println!("- Unlock rejected: requires {required} credits, {available} available");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    println!("\nTransaction history");
    let history = paywall.history(&token).await?;
    for transaction in &history {
        println!(
            "  - {} {:+} credits | {}",
            transaction.created_at.format("%Y-%m-%d %H:%M:%S"),
            transaction.amount,
            transaction.description
        );
    }
    let account = paywall.balance(&token).await?;
    println!("- Closing balance: {} credits", account.balance);

    if skip_federated {
        return Ok(());
    }

    println!("\nFederated sign-in");
    provider.seed_federated_identity(
        "demo-google-token",
        FederatedIdentity {
            user_id: "google-user-1".to_string(),
            email: "buyer@gmail.com".to_string(),
            full_name: "Eva Cerna".to_string(),
            first_sign_in: true,
        },
    );
    let login = identity
        .login_with_google("demo-google-token", Some("agent"))
        .await?;
    println!(
        "- Google sign-in for {} (new user: {})",
        login.user.email, login.is_new_user
    );

    let me = identity.current_user(&login.access_token).await?;
    match serde_json::to_string_pretty(&me) {
        Ok(json) => println!("  Current-user payload:\n{}", json),
        Err(err) => println!("  Current-user payload unavailable: {}", err),
    }

    identity.logout(Some(&login.access_token)).await?;
    println!("- Signed out");

    Ok(())
}

fn first_listing_id(rows: &[Value]) -> String {
    rows.first()
        .and_then(|row| row.get("id"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
