// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

#[endpoint {
    method = GET,
    path = "/v2/Users"
}]
pub async fn list_users(
    rqctx: RequestContext<Arc<ServerContext>>,
    query_params: Query<ListQuery>,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    if let Some(response) = apictx.intercept(&rqctx.request, &[]) {
        return response.map_err(HttpError::from);
    }

    let query_params = query_params.into_inner();

    let result: Result<Response<Body>, http::Error> =
        match apictx.store().list_users(&query_params) {
            Ok(list) => json_response(StatusCode::OK, &list),
            Err(error) => error.to_http_response(),
        };

    result.map_err(HttpError::from)
}

#[derive(Deserialize, JsonSchema)]
pub struct UserPathParam {
    user_id: String,
}

#[endpoint {
    method = GET,
    path = "/v2/Users/{user_id}"
}]
pub async fn get_user(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_param: Path<UserPathParam>,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    if let Some(response) = apictx.intercept(&rqctx.request, &[]) {
        return response.map_err(HttpError::from);
    }

    let path_param = path_param.into_inner();

    let result: Result<Response<Body>, http::Error> =
        match apictx.store().get_user(&path_param.user_id) {
            Ok(user) => json_response(StatusCode::OK, &user),
            Err(error) => error.to_http_response(),
        };

    result.map_err(HttpError::from)
}

#[endpoint {
    method = POST,
    path = "/v2/Users",
}]
pub async fn create_user(
    rqctx: RequestContext<Arc<ServerContext>>,
    body: UntypedBody,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    if let Some(response) = apictx.intercept(&rqctx.request, body.as_bytes()) {
        return response.map_err(HttpError::from);
    }

    let result: Result<Response<Body>, http::Error> =
        match parse_body(&body).and_then(|user| apictx.store().create_user(user))
        {
            Ok(user) => json_response(StatusCode::CREATED, &user),
            Err(error) => error.to_http_response(),
        };

    result.map_err(HttpError::from)
}

#[endpoint {
    method = PUT,
    path = "/v2/Users/{user_id}"
}]
pub async fn put_user(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_param: Path<UserPathParam>,
    body: UntypedBody,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    if let Some(response) = apictx.intercept(&rqctx.request, body.as_bytes()) {
        return response.map_err(HttpError::from);
    }

    let path_param = path_param.into_inner();

    let result: Result<Response<Body>, http::Error> = match parse_body(&body)
        .and_then(|user| apictx.store().replace_user(&path_param.user_id, user))
    {
        Ok(user) => json_response(StatusCode::OK, &user),
        Err(error) => error.to_http_response(),
    };

    result.map_err(HttpError::from)
}

#[endpoint {
    method = DELETE,
    path = "/v2/Users/{user_id}"
}]
pub async fn delete_user(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_param: Path<UserPathParam>,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    if let Some(response) = apictx.intercept(&rqctx.request, &[]) {
        return response.map_err(HttpError::from);
    }

    let path_param = path_param.into_inner();

    let result: Result<Response<Body>, http::Error> =
        match apictx.store().delete_user(&path_param.user_id) {
            Ok(()) => deleted_http_response(),
            Err(error) => error.to_http_response(),
        };

    result.map_err(HttpError::from)
}
