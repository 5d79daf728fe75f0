use std::collections::BTreeSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::RngCore;
use storefront_core::domain::action::{ids, ActionIcon, QuickAction};
use storefront_core::{
    CatalogError, ContextPatch, ConversationContext, IntentCatalog, IntentDefinition,
    ResponderError, ResponseResult,
};

pub mod topics {
    pub const GREETING: &str = "greeting";
    pub const PRODUCTS: &str = "products";
    pub const ORDERS: &str = "orders";
    pub const PAYMENT: &str = "payment";
    pub const SHIPPING: &str = "shipping";
    pub const RETURNS: &str = "returns";
    pub const CART: &str = "cart";
    pub const ACCOUNT: &str = "account";
    pub const SUPPORT: &str = "support";
}

/// Reply strategies behind the default storefront catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorefrontResponder {
    Greeting,
    Thanks,
    Goodbye,
    Support,
    Orders,
    Payment,
    Returns,
    Shipping,
    Cart,
    Products,
    Account,
    Help,
}

impl storefront_core::Responder for StorefrontResponder {
    fn respond(
        &self,
        context: &ConversationContext,
        message: &str,
        rng: &mut dyn RngCore,
    ) -> Result<ResponseResult, ResponderError> {
        let reply = match self {
            Self::Greeting => greeting(context, rng),
            Self::Thanks => thanks(rng),
            Self::Goodbye => goodbye(rng),
            Self::Support => support(),
            Self::Orders => orders(context),
            Self::Payment => payment(),
            Self::Returns => returns(),
            Self::Shipping => shipping(context),
            Self::Cart => cart(),
            Self::Products => products(context, message),
            Self::Account => account(),
            Self::Help => help(),
        };
        Ok(reply)
    }
}

/// The intent catalog the storefront ships with.
pub fn storefront_catalog() -> Result<IntentCatalog, CatalogError> {
    IntentCatalog::load(storefront_definitions())
}

pub fn storefront_definitions() -> Vec<IntentDefinition> {
    use StorefrontResponder as R;

    let define = |id: &str, responder: StorefrontResponder| {
        IntentDefinition::new(id, Arc::new(responder))
    };

    vec![
        define("greeting", R::Greeting)
            .pattern(r"^(hi|hello|hey|howdy|hiya|good (morning|afternoon|evening))\b")
            .keywords(["hello", "howdy", "greetings"])
            .priority(10),
        define("thanks", R::Thanks)
            .pattern(r"\b(thanks|thank you|thx|cheers)\b")
            .keywords(["appreciate", "grateful"])
            .priority(9),
        define("goodbye", R::Goodbye)
            .pattern(r"\b(bye|goodbye|see you|see ya)\b")
            .keywords(["farewell"])
            .priority(9),
        define("support", R::Support)
            .pattern(r"\b(talk|speak|chat) (to|with) (a |an )?(human|person|agent|someone|representative)\b")
            .pattern(r"\bcontact (support|you|us|customer service)\b")
            .pattern(r"\bcustomer (service|support)\b")
            .keywords(["support", "complaint", "representative", "human"])
            .priority(9),
        define("orders", R::Orders)
            .pattern(r"\b(track|tracking|where('s| is)) (my )?(order|package|parcel)\b")
            .pattern(r"\border (status|history|number)\b")
            .pattern(r"\bmy orders?\b")
            .keywords(["order", "tracking", "package", "parcel", "delivered"])
            .priority(8),
        define("payment", R::Payment)
            .pattern(r"\bpay (for|with|by)\b")
            .pattern(r"\bpayment (methods?|options?)\b")
            .pattern(r"\b(credit|debit) cards?\b")
            .keywords(["pay", "billing", "wallet", "installment", "invoice"])
            .priority(8),
        define("returns", R::Returns)
            .pattern(r"\b(return|refund|exchange)\b")
            .keywords(["refund", "return", "exchange", "damaged", "wrong size"])
            .priority(8),
        define("shipping", R::Shipping)
            .pattern(r"\b(shipping|delivery) (costs?|fees?|times?|options?)\b")
            .pattern(r"\bhow long\b.*\b(ship|shipping|deliver|delivery|arrive)\b")
            .pattern(r"\bfree shipping\b")
            .keywords(["shipping", "ship", "deliver", "courier", "express"])
            .priority(7),
        define("cart", R::Cart)
            .pattern(r"\b(my|view|open|show) (cart|basket)\b")
            .pattern(r"\b(add|put)\b.*\b(to|in) (my |the )?(cart|basket)\b")
            .pattern(r"\bcheck ?out\b")
            .keywords(["cart", "basket", "checkout"])
            .priority(7),
        define("products", R::Products)
            .pattern(r"\b(looking for|search for|find|show me|do you (have|sell|carry)|recommend)\b")
            .keywords([
                "product", "catalog", "browse", "shop", "buy", "price", "in stock", "size", "color",
                "sale", "discount",
            ])
            .priority(7),
        define("account", R::Account)
            .pattern(r"\b(my )?(account|profile)\b")
            .pattern(r"\b(change|update|reset|forgot) (my )?(password|email|address)\b")
            .pattern(r"\b(saved |shipping )?address(es)?\b")
            .keywords(["password", "login", "log in", "sign in", "address", "profile"])
            .priority(6),
        define("help", R::Help)
            .pattern(r"^(help|menu|options)\b")
            .pattern(r"\bwhat can you (do|help)\b")
            .keywords(["help", "assist"])
            .priority(5),
    ]
}

/// Product categories recognized in shopper messages, keyed by the token that
/// names them.
const PRODUCT_TERMS: &[(&str, &str)] = &[
    ("shoe", "shoes"),
    ("shoes", "shoes"),
    ("sneaker", "shoes"),
    ("sneakers", "shoes"),
    ("boots", "shoes"),
    ("shirt", "shirts"),
    ("shirts", "shirts"),
    ("t-shirt", "shirts"),
    ("tee", "shirts"),
    ("jacket", "jackets"),
    ("jackets", "jackets"),
    ("coat", "jackets"),
    ("hoodie", "jackets"),
    ("dress", "dresses"),
    ("dresses", "dresses"),
    ("jeans", "jeans"),
    ("pants", "jeans"),
    ("bag", "bags"),
    ("bags", "bags"),
    ("backpack", "bags"),
    ("watch", "watches"),
    ("watches", "watches"),
    ("headphones", "electronics"),
    ("laptop", "electronics"),
    ("phone", "electronics"),
];

pub fn extract_product_mentions(message: &str) -> BTreeSet<String> {
    let normalized = message.to_lowercase();
    normalized
        .split(|character: char| !(character.is_alphanumeric() || character == '-'))
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            PRODUCT_TERMS.iter().find(|(term, _)| *term == token).map(|(_, category)| category)
        })
        .map(|category| (*category).to_string())
        .collect()
}

fn pick<'a>(rng: &mut dyn RngCore, phrases: &[&'a str]) -> &'a str {
    phrases.choose(rng).copied().unwrap_or_default()
}

fn browse_catalog() -> QuickAction {
    QuickAction::new("Browse catalog", ids::BROWSE_CATALOG).icon(ActionIcon::Search)
}

fn view_orders() -> QuickAction {
    QuickAction::new("View my orders", ids::VIEW_ORDERS).icon(ActionIcon::Package)
}

fn view_cart() -> QuickAction {
    QuickAction::new("View cart", ids::VIEW_CART).icon(ActionIcon::Cart)
}

fn contact_support() -> QuickAction {
    QuickAction::new("Contact support", ids::CONTACT_SUPPORT).icon(ActionIcon::Support)
}

fn greeting(context: &ConversationContext, rng: &mut dyn RngCore) -> ResponseResult {
    let text = if context.greeting_given {
        pick(
            rng,
            &[
                "Hello again! What else can I help you with?",
                "Hi again! Anything else you're looking for?",
            ],
        )
    } else {
        pick(
            rng,
            &[
                "Hi there! I'm your shopping assistant. I can help you find products, \
                 track orders, or answer questions about payments and returns.",
                "Hello! Welcome to the store. Ask me about products, your orders, \
                 shipping or payments.",
                "Hey! Good to see you. What are you shopping for today?",
            ],
        )
    };

    ResponseResult::text(text)
        .actions([browse_catalog(), view_orders(), view_cart()])
        .patch(ContextPatch::topic(topics::GREETING).greeting_given(true))
}

fn thanks(rng: &mut dyn RngCore) -> ResponseResult {
    let text = pick(
        rng,
        &[
            "You're welcome! Let me know if there's anything else I can do.",
            "Happy to help! Anything else?",
            "Anytime! Enjoy your shopping.",
        ],
    );
    ResponseResult::text(text).patch(ContextPatch::clear_topic())
}

fn goodbye(rng: &mut dyn RngCore) -> ResponseResult {
    let text = pick(
        rng,
        &["Goodbye! Thanks for stopping by.", "See you soon! Happy shopping.", "Take care!"],
    );
    ResponseResult::text(text).patch(ContextPatch::clear_topic())
}

fn support() -> ResponseResult {
    ResponseResult::text(
        "I can connect you with our support team. They're available **Mon-Fri, 9am-6pm** \
         and usually reply within a few hours.",
    )
    .action(contact_support())
    .patch(ContextPatch::topic(topics::SUPPORT))
}

fn orders(context: &ConversationContext) -> ResponseResult {
    let text = if context.asked_about_orders {
        "Let's take another look at your orders. Your order history shows the latest \
         status and tracking link for each one."
    } else {
        "You can follow every order from your order history:\n\
         • **Processing**: we're preparing your items\n\
         • **Shipped**: a tracking number is attached\n\
         • **Delivered**: you can start a return from here if needed"
    };

    ResponseResult::text(text)
        .actions([
            view_orders(),
            QuickAction::new("Track shipment", ids::TRACK_SHIPMENT).icon(ActionIcon::Truck),
        ])
        .patch(ContextPatch::topic(topics::ORDERS).asked_about_orders(true))
}

fn payment() -> ResponseResult {
    ResponseResult::text(
        "We accept the following payment methods:\n\
         • Credit and debit cards (Visa, Mastercard, Amex)\n\
         • PayPal\n\
         • Apple Pay and Google Pay\n\
         Card details are stored securely and you can manage them from your account.",
    )
    .action(
        QuickAction::new("Manage payment methods", ids::PAYMENT_METHODS)
            .icon(ActionIcon::CreditCard),
    )
    .patch(ContextPatch::topic(topics::PAYMENT).asked_about_payments(true))
}

fn returns() -> ResponseResult {
    ResponseResult::text(
        "You can return most items within **30 days** of delivery. Refunds go back to \
         the original payment method within 5-7 business days after we receive the item.",
    )
    .actions([
        QuickAction::new("Start a return", ids::START_RETURN).icon(ActionIcon::Return),
        view_orders(),
    ])
    .patch(ContextPatch::topic(topics::RETURNS))
}

fn shipping(context: &ConversationContext) -> ResponseResult {
    let mut reply = ResponseResult::text(
        "Shipping options:\n\
         • **Standard**: 3-5 business days, free over $50\n\
         • **Express**: 1-2 business days\n\
         Delivery estimates are shown at checkout.",
    )
    .action(QuickAction::new("Shipping details", ids::SHIPPING_INFO).icon(ActionIcon::Truck));

    if context.asked_about_orders {
        reply = reply.action(
            QuickAction::new("Track shipment", ids::TRACK_SHIPMENT).icon(ActionIcon::Truck),
        );
    }

    reply.patch(ContextPatch::topic(topics::SHIPPING))
}

fn cart() -> ResponseResult {
    ResponseResult::text(
        "Your cart keeps everything you've added until you check out. \
         You can change quantities or remove items there.",
    )
    .actions([
        view_cart(),
        QuickAction::new("Go to checkout", ids::CHECKOUT).icon(ActionIcon::Cart),
    ])
    .patch(ContextPatch::topic(topics::CART))
}

fn products(context: &ConversationContext, message: &str) -> ResponseResult {
    let found = extract_product_mentions(message);
    let text = if !found.is_empty() {
        format!(
            "Great choice! I can help you find **{}**. Browse the catalog to filter by size, \
             color and price.",
            join(&found)
        )
    } else if !context.mentioned_products.is_empty() {
        format!(
            "Still looking for **{}**? The catalog has filters for size, color and price.",
            join(&context.mentioned_products)
        )
    } else {
        "I can help you find products! Tell me what you're looking for, or browse the \
         catalog by category."
            .to_string()
    };

    let mut mentioned = context.mentioned_products.clone();
    mentioned.extend(found);

    ResponseResult::text(text)
        .action(browse_catalog())
        .patch(ContextPatch::topic(topics::PRODUCTS).mentioned_products(mentioned))
}

fn account() -> ResponseResult {
    ResponseResult::text(
        "From your account you can update your profile, change your password, \
         and manage saved addresses and payment methods.",
    )
    .actions([
        QuickAction::new("Account settings", ids::ACCOUNT).icon(ActionIcon::User),
        QuickAction::new("Saved addresses", ids::ADDRESSES).icon(ActionIcon::User),
    ])
    .patch(ContextPatch::topic(topics::ACCOUNT))
}

fn help() -> ResponseResult {
    ResponseResult::text(
        "Here's what I can help with:\n\
         • Finding products\n\
         • Order status and tracking\n\
         • Payments, shipping and returns\n\
         • Your account and saved addresses",
    )
    .actions([browse_catalog(), view_orders(), view_cart(), contact_support()])
}

fn join(items: &BTreeSet<String>) -> String {
    items.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
