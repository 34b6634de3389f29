//! `Verifier` implementation over webauthn-rs.
//!
//! The ceremony "challenge" handed to the coordinators is the serialized
//! webauthn-rs ceremony state (it embeds the random challenge bytes), which
//! is why the crate is built with `danger-allow-state-serialisation`.

use crate::domain::{
    AssertionResponse, AttestationResponse, AuthenticationInfo, AuthenticationVerification,
    ChallengeOptions, Credential, DeviceType, ExpectedCeremony, IssuedChallenge,
    RegistrationInfo, RegistrationOptionsRequest, RegistrationVerification, RelyingParty,
    Verifier, VerifierError,
};
use serde_json::Value;
use webauthn_rs::prelude::*;

/// Flags webauthn-rs keeps inside the serialized passkey record.
struct PasskeyFlags {
    counter: u32,
    backup_eligible: bool,
    backed_up: bool,
}

impl PasskeyFlags {
    // ---
    fn from_passkey(passkey: &Passkey) -> Result<Self, VerifierError> {
        // ---
        let value = serde_json::to_value(passkey).map_err(internal)?;
        Self::from_value(&value)
    }

    fn from_value(value: &Value) -> Result<Self, VerifierError> {
        // ---
        let cred = value
            .get("cred")
            .ok_or_else(|| VerifierError("passkey record has no cred".to_string()))?;

        let counter = cred
            .get("counter")
            .and_then(Value::as_u64)
            .and_then(|c| u32::try_from(c).ok())
            .ok_or_else(|| missing_flag("counter"))?;
        let backup_eligible = cred
            .get("backup_eligible")
            .and_then(Value::as_bool)
            .ok_or_else(|| missing_flag("backup_eligible"))?;
        let backed_up = cred
            .get("backup_state")
            .and_then(Value::as_bool)
            .ok_or_else(|| missing_flag("backup_state"))?;

        Ok(Self {
            counter,
            backup_eligible,
            backed_up,
        })
    }
}

fn missing_flag(name: &str) -> VerifierError {
    // ---
    VerifierError(format!("passkey record has no usable {name}"))
}

fn internal(err: impl std::fmt::Display) -> VerifierError {
    // ---
    VerifierError(err.to_string())
}

/// webauthn-rs backed attestation and assertion verifier.
pub struct WebauthnVerifier {
    // ---
    webauthn: Webauthn,
    relying_party: RelyingParty,
}

impl WebauthnVerifier {
    // ---
    pub fn new(webauthn: Webauthn, relying_party: RelyingParty) -> Self {
        // ---
        Self {
            webauthn,
            relying_party,
        }
    }

    /// The `Webauthn` instance is bound to one RP; refuse to verify for another.
    fn ensure_relying_party(&self, rp_id: &str, origin: Option<&str>) -> Result<(), VerifierError> {
        // ---
        if rp_id != self.relying_party.id {
            return Err(VerifierError(format!("unexpected relying party id: {rp_id}")));
        }
        if let Some(origin) = origin {
            if origin.trim_end_matches('/') != self.relying_party.origin.trim_end_matches('/') {
                return Err(VerifierError(format!("unexpected origin: {origin}")));
            }
        }
        Ok(())
    }
}

impl Verifier for WebauthnVerifier {
    // ---
    fn generate_registration_options(
        &self,
        request: &RegistrationOptionsRequest,
    ) -> Result<IssuedChallenge, VerifierError> {
        // ---
        self.ensure_relying_party(&request.rp_id, None)?;

        let exclude: Vec<CredentialID> = request
            .exclude_credentials
            .iter()
            .map(|id| CredentialID::from(id.clone()))
            .collect();
        let exclude = if exclude.is_empty() { None } else { Some(exclude) };

        let (ccr, registration_state) = self
            .webauthn
            .start_passkey_registration(
                request.user_id,
                &request.user_name,
                &request.user_display_name,
                exclude,
            )
            .map_err(internal)?;

        let mut options = serde_json::to_value(&ccr).map_err(internal)?;

        // Ask for a discoverable credential so username-less login can find it.
        if let Some(selection) = options
            .pointer_mut("/publicKey/authenticatorSelection")
            .and_then(Value::as_object_mut)
        {
            selection.insert("residentKey".to_string(), Value::from("preferred"));
        }

        let state = serde_json::to_string(&registration_state).map_err(internal)?;

        Ok(IssuedChallenge {
            options: ChallengeOptions::new(options),
            state,
        })
    }

    fn verify_registration_response(
        &self,
        response: &AttestationResponse,
        expected: &ExpectedCeremony,
    ) -> Result<RegistrationVerification, VerifierError> {
        // ---
        self.ensure_relying_party(&expected.rp_id, Some(&expected.origin))?;

        let credential: RegisterPublicKeyCredential =
            serde_json::from_value(response.as_json().clone())
                .map_err(|e| VerifierError(format!("malformed attestation response: {e}")))?;

        let registration_state: PasskeyRegistration = serde_json::from_str(&expected.challenge)
            .map_err(|e| VerifierError(format!("unusable registration challenge: {e}")))?;

        let passkey = self
            .webauthn
            .finish_passkey_registration(&credential, &registration_state)
            .map_err(internal)?;

        let flags = PasskeyFlags::from_passkey(&passkey)?;
        let public_key = serde_json::to_vec(&passkey).map_err(internal)?;

        Ok(RegistrationVerification {
            verified: true,
            registration_info: Some(RegistrationInfo {
                credential_id: passkey.cred_id().to_vec(),
                public_key,
                counter: flags.counter,
                device_type: DeviceType::from_backup_eligibility(flags.backup_eligible),
                backup_eligible: flags.backup_eligible,
                backed_up: flags.backed_up,
            }),
        })
    }

    fn generate_authentication_options(&self) -> Result<IssuedChallenge, VerifierError> {
        // ---
        let (rcr, authentication_state) = self
            .webauthn
            .start_discoverable_authentication()
            .map_err(internal)?;

        let options = serde_json::to_value(&rcr).map_err(internal)?;
        let state = serde_json::to_string(&authentication_state).map_err(internal)?;

        Ok(IssuedChallenge {
            options: ChallengeOptions::new(options),
            state,
        })
    }

    fn verify_authentication_response(
        &self,
        response: &AssertionResponse,
        expected: &ExpectedCeremony,
        credential: &Credential,
    ) -> Result<AuthenticationVerification, VerifierError> {
        // ---
        self.ensure_relying_party(&expected.rp_id, Some(&expected.origin))?;

        let assertion: PublicKeyCredential = serde_json::from_value(response.as_json().clone())
            .map_err(|e| VerifierError(format!("malformed assertion response: {e}")))?;

        let authentication_state: DiscoverableAuthentication =
            serde_json::from_str(&expected.challenge)
                .map_err(|e| VerifierError(format!("unusable authentication challenge: {e}")))?;

        let mut passkey: Passkey = serde_json::from_slice(&credential.public_key)
            .map_err(|e| VerifierError(format!("unusable stored credential: {e}")))?;

        let result = self
            .webauthn
            .finish_discoverable_authentication(
                &assertion,
                authentication_state,
                &[DiscoverableKey::from(&passkey)],
            )
            .map_err(internal)?;

        if result.cred_id().to_vec() != credential.id {
            return Err(VerifierError(
                "assertion was made with a different credential".to_string(),
            ));
        }

        let updated_public_key = match passkey.update_credential(&result) {
            Some(true) => Some(serde_json::to_vec(&passkey).map_err(internal)?),
            _ => None,
        };

        Ok(AuthenticationVerification {
            verified: true,
            authentication_info: Some(AuthenticationInfo {
                credential_id: credential.id.clone(),
                new_counter: result.counter(),
                user_verified: result.user_verified(),
                updated_public_key,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::config::WebAuthnConfig;
    use crate::infrastructure::webauthn::create_webauthn_verifier;
    use serde_json::json;
    use uuid::Uuid;

    fn verifier() -> WebauthnVerifier {
        // ---
        let config = WebAuthnConfig {
            rp_id: "localhost".to_string(),
            rp_name: "Test App".to_string(),
            origin: "http://localhost:8080".to_string(),
        };
        create_webauthn_verifier(&config).unwrap()
    }

    fn options_request(rp_id: &str) -> RegistrationOptionsRequest {
        // ---
        RegistrationOptionsRequest {
            rp_name: "Test App".to_string(),
            rp_id: rp_id.to_string(),
            user_id: Uuid::new_v4(),
            user_name: "a@x.com".to_string(),
            user_display_name: "Alice".to_string(),
            exclude_credentials: vec![vec![0x01, 0x02]],
        }
    }

    #[test]
    fn registration_options_carry_user_and_exclusions() {
        // ---
        let issued = verifier()
            .generate_registration_options(&options_request("localhost"))
            .unwrap();

        let public_key = &issued.options.as_json()["publicKey"];
        assert_eq!(public_key["rp"]["id"], "localhost");
        assert_eq!(public_key["user"]["name"], "a@x.com");
        assert_eq!(public_key["user"]["displayName"], "Alice");
        assert!(public_key["challenge"].is_string());
        assert_eq!(public_key["excludeCredentials"].as_array().map(Vec::len), Some(1));
        assert!(!issued.state.is_empty());
    }

    #[test]
    fn registration_options_for_foreign_rp_are_refused() {
        // ---
        let result = verifier().generate_registration_options(&options_request("evil.example"));
        assert!(result.is_err());
    }

    #[test]
    fn authentication_options_are_username_less() {
        // ---
        let issued = verifier().generate_authentication_options().unwrap();
        let public_key = &issued.options.as_json()["publicKey"];

        assert!(public_key["challenge"].is_string());
        let allowed = public_key
            .get("allowCredentials")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        assert_eq!(allowed, 0);
    }

    #[test]
    fn malformed_attestation_is_rejected() {
        // ---
        let verifier = verifier();
        let issued = verifier
            .generate_registration_options(&options_request("localhost"))
            .unwrap();
        let expected = ExpectedCeremony {
            challenge: issued.state,
            origin: "http://localhost:8080".to_string(),
            rp_id: "localhost".to_string(),
        };

        let result = verifier.verify_registration_response(
            &AttestationResponse::new(json!({ "id": "AQ" })),
            &expected,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unexpected_origin_is_rejected() {
        // ---
        let verifier = verifier();
        let expected = ExpectedCeremony {
            challenge: "{}".to_string(),
            origin: "https://evil.example".to_string(),
            rp_id: "localhost".to_string(),
        };

        let result =
            verifier.verify_registration_response(&AttestationResponse::new(json!({})), &expected);
        match result {
            Err(VerifierError(message)) => assert!(message.contains("unexpected origin")),
            Ok(_) => panic!("foreign origin accepted"),
        }
    }

    #[test]
    fn passkey_flags_are_read_from_the_record() {
        // ---
        let record = json!({
            "cred": { "counter": 7, "backup_eligible": true, "backup_state": false }
        });
        let flags = PasskeyFlags::from_value(&record).unwrap();
        assert_eq!(flags.counter, 7);
        assert!(flags.backup_eligible);
        assert!(!flags.backed_up);
    }

    #[test]
    fn passkey_record_without_flags_is_an_error() {
        // ---
        for missing in ["counter", "backup_eligible", "backup_state"] {
            let mut record = json!({
                "cred": { "counter": 7, "backup_eligible": true, "backup_state": false }
            });
            record["cred"].as_object_mut().unwrap().remove(missing);

            let err = PasskeyFlags::from_value(&record).err().unwrap();
            assert!(err.0.contains(missing), "unexpected error: {}", err.0);
        }

        assert!(PasskeyFlags::from_value(&json!({})).is_err());
    }
}
