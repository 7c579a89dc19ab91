/// Acknowledgement shown when the storefront's Shop Now button is pressed.
pub const SHOP_NOW_ACKNOWLEDGEMENT: &str = "Shop Now button clicked!";

/// Acknowledgement for an out-of-stock reminder request on a named medicine.
pub fn stock_request_acknowledgement(medicine_name: &str) -> String {
    format!("Stock request for {medicine_name} has been noted. We'll notify when available.")
}

#[cfg(test)]
mod tests {
    use super::{stock_request_acknowledgement, SHOP_NOW_ACKNOWLEDGEMENT};

    #[test]
    fn shop_now_copy_is_stable() {
        assert_eq!(SHOP_NOW_ACKNOWLEDGEMENT, "Shop Now button clicked!");
    }

    #[test]
    fn stock_request_copy_names_the_medicine() {
        assert_eq!(
            stock_request_acknowledgement("Paracetamol"),
            "Stock request for Paracetamol has been noted. We'll notify when available."
        );
    }
}
