//! Lua scripts for atomic Redis operations.
//!
//! Redis runs each script to completion without interleaving other commands,
//! so the read-compare-write sequences below cannot race with concurrent
//! requests for the same phone number.

/// Increment a counter only while it is below a limit.
///
/// Arguments:
/// - KEYS[1]: Counter key (e.g., `rate_limit:{phone}`)
/// - ARGV[1]: Limit
/// - ARGV[2]: TTL in milliseconds, applied on successful increment
///
/// Returns:
/// - New counter value on success
/// - -1: Counter already at or above the limit (nothing written)
/// - Error reply if the stored value or limit is not an integer
pub const INCREMENT_BELOW: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
local limit = tonumber(ARGV[1])

if current == nil or limit == nil then
    return redis.error_reply('value is not an integer')
end

if current >= limit then
    return -1
end

local new_count = redis.call('INCR', KEYS[1])
redis.call('PEXPIRE', KEYS[1], ARGV[2])
return new_count
"#;

/// Decrement a counter only while it is above zero, keeping its TTL.
///
/// Arguments:
/// - KEYS[1]: Counter key (e.g., `rate_limit:{phone}`)
///
/// Returns:
/// - New counter value on success
/// - -1: Counter missing or already at zero (nothing written)
/// - Error reply if the stored value is not an integer
pub const DECREMENT_ABOVE_ZERO: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')

if current == nil then
    return redis.error_reply('value is not an integer')
end

if current <= 0 then
    return -1
end

return redis.call('DECR', KEYS[1])
"#;

/// Replace or delete a value only if it still equals the expected value.
///
/// Arguments:
/// - KEYS[1]: Key (e.g., `otp:{phone}`)
/// - ARGV[1]: Expected current value
/// - ARGV[2]: Mode, `delete` or `set`
/// - ARGV[3]: Replacement value (ignored for `delete`)
/// - ARGV[4]: Replacement TTL in milliseconds (ignored for `delete`)
///
/// Returns:
/// - 1: Swap applied
/// - 0: Key missing or value changed (nothing written)
pub const COMPARE_AND_SWAP: &str = r#"
local current = redis.call('GET', KEYS[1])

if current ~= ARGV[1] then
    return 0
end

if ARGV[2] == 'delete' then
    redis.call('DEL', KEYS[1])
else
    redis.call('SET', KEYS[1], ARGV[3], 'PX', ARGV[4])
end

return 1
"#;
