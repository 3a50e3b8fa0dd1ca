use std::time::Duration;

use acme::{
    api::AuthorizationStatus,
    config::{Config, CONTACT_VAR, DOMAIN_VAR},
    create_csr, create_p256_key,
    responder::ChallengeResponder,
    store::{self, AccountRecord, CertificateRecord},
    AcmeKey, Certificate, Client,
};
use eyre::{bail, eyre};

const POLL_DELAY: Duration = Duration::from_secs(3);
const POLL_ATTEMPTS: usize = 40;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;

    let domain = config
        .domain
        .clone()
        .ok_or_else(|| eyre!("{DOMAIN_VAR} is required"))?;

    let mut account = load_account(&config)?;
    let key = AcmeKey::from_pem(&account.private_key_pem)?;
    let client = Client::new(config.directory(), key);

    if account.registration_location.is_none() {
        account.registration_location = Some(register(&client, &config).await?);
        store::write_json(config.account_path(), &account)?;
    }

    let authz = client.new_authorization(&domain).await?;
    log::info!("Authorization for {domain} is {}", authz.body.status);

    if authz.body.status != AuthorizationStatus::Valid {
        let authz_uri = authz
            .location
            .clone()
            .ok_or_else(|| eyre!("authority did not return an authorization location"))?;

        let challenge = authz
            .body
            .http_challenge()
            .ok_or_else(|| eyre!("authority offered no http-01 challenge for {domain}"))?;

        let responder = ChallengeResponder::new();
        responder.insert(&domain, &challenge.token, client.key_authorization(&challenge.token)?);
        let server = responder.bind(config.responder_port)?;

        client.respond_to_challenge(challenge).await?;
        let status = poll_authorization(&client, &authz_uri).await;

        server.stop().await?;

        match status? {
            AuthorizationStatus::Valid => log::info!("Domain {domain} validated"),
            status => bail!("authorization for {domain} ended as {status}"),
        }
    }

    let cert_key = create_p256_key();
    let csr = create_csr(&cert_key, &[&domain])?;

    let res = client.new_certificate(&csr).await?;
    let cert = Certificate::new(AcmeKey::from_key(cert_key).to_pem()?, res.body);

    if let Ok(days) = cert.valid_days_left() {
        log::info!("Certificate for {domain} is valid for {days} days");
    }

    let record = CertificateRecord {
        domain: domain.clone(),
        private_key_pem: cert.private_key().to_owned(),
        certificate_pem: cert.certificate_pem()?,
        location: res.location,
    };

    let path = config.certificate_path(&domain);
    store::write_json(&path, &record)?;
    log::info!("Saved certificate to {}", path.display());

    Ok(())
}

fn load_account(config: &Config) -> eyre::Result<AccountRecord> {
    if let Some(account) = store::read_json::<AccountRecord>(config.account_path()) {
        return Ok(account);
    }

    log::info!("Generating a new account key");

    let account = AccountRecord {
        private_key_pem: AcmeKey::generate().to_pem()?.to_string(),
        registration_location: None,
    };

    store::write_json(config.account_path(), &account)?;

    Ok(account)
}

/// Registers the account and agrees to the terms of service. Returns the registration URI.
async fn register(client: &Client, config: &Config) -> eyre::Result<String> {
    if config.contacts.is_empty() {
        bail!("{CONTACT_VAR} is required to register an account");
    }

    let reg = client.new_registration(&config.contacts, None).await?;

    let location = reg
        .location
        .clone()
        .ok_or_else(|| eyre!("authority did not return a registration location"))?;

    log::info!("Registered account at {location}");

    if let Some(tos) = reg.link("terms-of-service") {
        if reg.body.agreement.as_deref() != Some(tos) {
            log::info!("Agreeing to terms of service: {tos}");

            let mut registration = reg.body.clone();
            registration.agreement = Some(tos.to_owned());
            client.update_registration(&location, &registration).await?;
        }
    }

    Ok(location)
}

async fn poll_authorization(client: &Client, uri: &str) -> eyre::Result<AuthorizationStatus> {
    for _ in 0..POLL_ATTEMPTS {
        tokio::time::sleep(POLL_DELAY).await;

        let status = client.check_authorization_status(uri).await?;
        log::debug!("Authorization status: {status}");

        if status.is_terminal() {
            return Ok(status);
        }
    }

    bail!("authorization still pending after {POLL_ATTEMPTS} attempts")
}
