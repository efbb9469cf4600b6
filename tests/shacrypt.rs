use anyhow::Result;
use natron::hash::shacrypt::{
    self, generate_salt, hash_password, requires_rehash, verify_password, HashConfig, HashString,
    RehashResult, ShaCryptError, Variant, Verifier, ROUNDS_DEFAULT,
};
use natron::NatronError;

fn is_mismatch(result: std::result::Result<(), NatronError>) -> bool {
    result == Err(NatronError::ShaCryptError(ShaCryptError::Mismatch))
}

#[test]
fn store_and_log_in() -> Result<()> {
    let config = HashConfig {
        rounds: 20_000,
        ..Default::default()
    };

    let stored = config.hash("hunter2")?;
    let parsed: HashString = stored.parse()?;
    assert_eq!(parsed.variant(), Variant::Sha512);
    assert_eq!(parsed.rounds(), 20_000);

    verify_password("hunter2", &stored)?;
    assert!(is_mismatch(verify_password("hunter3", &stored)));
    assert!(is_mismatch(verify_password("", &stored)));

    Ok(())
}

#[test]
fn upgrade_rounds_on_login() -> Result<()> {
    // A hash written by an older deployment, with the default round count.
    let old = hash_password("hunter2", &generate_salt(12)?, ROUNDS_DEFAULT, Variant::Sha256)?;

    let current = HashConfig {
        variant: Variant::Sha512,
        rounds: 6000,
        ..Default::default()
    };

    verify_password("hunter2", &old)?;
    assert_eq!(current.requires_rehash(&old)?, RehashResult::ParametersDiffer);

    let new = current.hash("hunter2")?;
    assert_eq!(current.requires_rehash(&new)?, RehashResult::ParametersMatch);
    assert_eq!(
        requires_rehash(&new, Variant::Sha512, 6000)?,
        RehashResult::ParametersMatch
    );
    verify_password("hunter2", &new)?;

    Ok(())
}

#[test]
fn glibc_compatible_hashes() -> Result<()> {
    // Produced by glibc's crypt(3).
    let hashes = [
        "$5$rounds=1000$saltstring$z/y8l95GSjij6uHx2xAJer7YCODLtrhIxItWC13D4g5",
        "$6$rounds=1000$saltstring$Zu2Vknok2/f53APfN687ADnzeNBLcsEgTwvcBHMD2./07rZQAt8vsuKVufD15dyZh.LOLB/uZKf6I3GyON4bp/",
    ];

    for hash in hashes {
        verify_password("Hello world!", hash)?;
        Verifier::new(1000).verify("Hello world!", hash)?;
        assert!(is_mismatch(verify_password("Hello world", hash)));
    }

    shacrypt::sha256::verify_password("Hello world!", hashes[0])?;
    shacrypt::sha512::verify_password("Hello world!", hashes[1])?;

    Ok(())
}

#[test]
fn untrusted_hashes_are_bounded() {
    let verifier = Verifier::new(ROUNDS_DEFAULT);
    let hash = "$5$rounds=10000$saltstringsaltst$3xv.VbSHBb41AL9AvLeujZkZRBAwqFMz2.opqey6IcA";

    assert_eq!(
        verifier.verify("Hello world!", hash),
        Err(NatronError::ShaCryptError(ShaCryptError::RoundsLimitExceeded))
    );
    assert_eq!(verify_password("Hello world!", hash), Ok(()));
}

#[test]
fn malformed_hashes_are_never_mismatches() {
    let malformed = [
        "",
        "$",
        "$5$",
        "*",
        "!$6$saltstring$svn8UoSVapNtMuq1ukKS4tPQd8iKwSMHWjl/O817G3uBnIFNjnQJuesI68u4OTLiBFdcbYEdFCoEOfaS35inz1",
        "$6$saltstring$svn8UoSVapNtMuq1ukKS4tPQd8iKwSMHWjl/O817G3uBnIFNjnQJuesI68u4OTLiBFdcbYEdFCoEOfaS35inz",
        "$6$saltstring$svn8UoSVapNtMuq1ukKS4tPQd8iKwSMHWjl/O817G3uBnIFNjnQJuesI68u4OTLiBFdcbYEdFCoEOfaS35inz1=",
        "$5$salt string$5B8vYYiY.CVt1RlTTf8KbXBH3hsxY/GNooZaBBGWEc5",
        "$5$rounds=ten$saltstring$5B8vYYiY.CVt1RlTTf8KbXBH3hsxY/GNooZaBBGWEc5",
        "$1$saltstring$5B8vYYiY.CVt1RlTTf8KbXBH3hsxY/GNooZaBBGWEc5",
    ];

    for hash in malformed {
        let result = verify_password("Hello world!", hash);
        assert!(result.is_err(), "{}", hash);
        assert!(!is_mismatch(result), "{}", hash);
    }
}
