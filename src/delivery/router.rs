use crate::core::{Channel, Client, DeliveryMode, InvoicingError};

/// Pick the delivery channel for a client.
///
/// A client that opted into structured delivery must carry a network
/// address; it is never silently downgraded to the fallback channel.
pub fn decide(client: &Client) -> Result<Channel, InvoicingError> {
    match client.delivery_mode {
        DeliveryMode::Structured => match &client.network_address {
            Some(addr) if addr.is_well_formed() => Ok(Channel::Structured),
            _ => Err(InvoicingError::MissingNetworkId),
        },
        DeliveryMode::Fallback => Ok(Channel::Fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AddressBuilder, ClientBuilder, NetworkAddress};
    use uuid::Uuid;

    fn client() -> ClientBuilder {
        ClientBuilder::new(
            Uuid::new_v4(),
            "Kunde BV",
            AddressBuilder::new("Gent", "9000", "BE").build(),
        )
    }

    #[test]
    fn structured_with_address() {
        let c = client().structured("0208", "0123456789").build();
        assert_eq!(decide(&c).unwrap(), Channel::Structured);
    }

    #[test]
    fn structured_without_address_is_an_error() {
        let c = client().delivery_mode(DeliveryMode::Structured).build();
        assert!(matches!(decide(&c), Err(InvoicingError::MissingNetworkId)));
    }

    #[test]
    fn structured_with_blank_id_is_an_error() {
        let mut c = client().structured("0208", "x").build();
        c.network_address = Some(NetworkAddress::new("0208", "  "));
        assert!(matches!(decide(&c), Err(InvoicingError::MissingNetworkId)));
    }

    #[test]
    fn fallback_ignores_network_address() {
        let mut c = client().structured("0208", "0123456789").build();
        c.delivery_mode = DeliveryMode::Fallback;
        assert_eq!(decide(&c).unwrap(), Channel::Fallback);
        assert_eq!(decide(&client().build()).unwrap(), Channel::Fallback);
    }
}
